//! Minimal raster drawing on an RGB image

use image::{Rgb, RgbImage};

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Fill the whole image with one colour
pub fn fill(img: &mut RgbImage, color: Rgb<u8>) {
    for pixel in img.pixels_mut() {
        *pixel = color;
    }
}

/// Set a pixel, ignoring coordinates outside the image
pub fn plot(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
        return;
    };
    if x < img.width() && y < img.height() {
        img.put_pixel(x, y, color);
    }
}

/// Draw a line with Bresenham's algorithm, `thickness` pixels tall
pub fn line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), thickness: i64, color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        for t in 0..thickness.max(1) {
            plot(img, x, y + t, color);
        }
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_covers_endpoints() {
        let mut img = RgbImage::new(10, 10);
        fill(&mut img, WHITE);
        line(&mut img, (1, 1), (8, 5), 1, BLACK);
        assert_eq!(*img.get_pixel(1, 1), BLACK);
        assert_eq!(*img.get_pixel(8, 5), BLACK);
        assert_eq!(*img.get_pixel(8, 1), WHITE);
    }

    #[test]
    fn test_plot_clips() {
        let mut img = RgbImage::new(4, 4);
        fill(&mut img, WHITE);
        plot(&mut img, -1, 2, BLACK);
        plot(&mut img, 2, 40, BLACK);
        assert!(img.pixels().all(|p| *p == WHITE));
    }
}
