//! PNG line chart renderer

use crate::canvas::{self, BLACK, WHITE};
use crate::error::{ChartError, Result};
use crate::series::{self, Point};
use chartcache_cache::{RenderFailure, RenderRequest, Renderer};
use chrono::Datelike;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use sha2::{Digest, Sha256};

/// Version of the drawing logic; part of every cache key by default
///
/// Bump this when a change would alter the pixels of an existing chart.
pub const FINGERPRINT: &str = "chart-v1";

/// Default limit on plotted points
pub const DEFAULT_MAX_COUNT: u32 = 10_000;

/// Canvas settings for [`ChartRenderer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartOptions {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Blank border around the plot area
    pub margin: u32,
    /// Largest accepted `count`
    pub max_count: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            margin: 48,
            max_count: DEFAULT_MAX_COUNT,
        }
    }
}

/// Renders a request as a PNG line chart
///
/// Output depends only on the request and the options, so identical
/// requests produce identical bytes.
#[derive(Debug, Clone, Default)]
pub struct ChartRenderer {
    options: ChartOptions,
}

impl ChartRenderer {
    /// Create a renderer with the given canvas settings
    #[must_use]
    pub const fn new(options: ChartOptions) -> Self {
        Self { options }
    }

    /// Canvas settings in use
    #[must_use]
    pub const fn options(&self) -> &ChartOptions {
        &self.options
    }

    /// Render `request` to PNG bytes
    pub fn render_png(&self, request: &RenderRequest) -> Result<Vec<u8>> {
        let img = self.draw(request)?;
        let mut buf = Vec::new();
        PngEncoder::new(&mut buf).write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            ExtendedColorType::Rgb8,
        )?;
        Ok(buf)
    }

    /// Render `request` to an in-memory image
    pub fn draw(&self, request: &RenderRequest) -> Result<RgbImage> {
        let ChartOptions {
            width,
            height,
            margin,
            max_count,
        } = self.options;

        if width <= margin.saturating_mul(2) || height <= margin.saturating_mul(2) {
            return Err(ChartError::InvalidCanvas {
                width,
                height,
                margin,
            });
        }
        if request.count() > max_count {
            return Err(ChartError::TooManyPoints {
                count: request.count(),
                max: max_count,
            });
        }

        let points = series::series(request)?;
        let area = PlotArea::new(width, height, margin);

        let mut img = RgbImage::new(width, height);
        canvas::fill(&mut img, WHITE);
        draw_axes(&mut img, &area);
        draw_day_ticks(&mut img, &area, &points);
        draw_series(&mut img, &area, &points, label_color(request.label()));

        tracing::debug!(
            request = %request,
            points = points.len(),
            width,
            height,
            "chart drawn"
        );
        Ok(img)
    }
}

impl Renderer for ChartRenderer {
    fn render(&self, request: &RenderRequest) -> std::result::Result<Vec<u8>, RenderFailure> {
        Ok(self.render_png(request)?)
    }

    fn fingerprint(&self) -> &str {
        FINGERPRINT
    }
}

/// Pixel bounds of the plot area
struct PlotArea {
    left: i64,
    right: i64,
    top: i64,
    bottom: i64,
}

impl PlotArea {
    fn new(width: u32, height: u32, margin: u32) -> Self {
        Self {
            left: i64::from(margin),
            right: i64::from(width - margin),
            top: i64::from(margin),
            bottom: i64::from(height - margin),
        }
    }

    /// x pixel of the `index`-th of `len` evenly spaced days
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn x(&self, index: usize, len: usize) -> i64 {
        if len <= 1 {
            return (self.left + self.right) / 2;
        }
        let span = (self.right - self.left) as f64;
        self.left + (span * index as f64 / (len - 1) as f64).round() as i64
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn y(&self, value: f64, (min, max): (f64, f64)) -> i64 {
        let span = (self.bottom - self.top) as f64;
        self.bottom - (span * (value - min) / (max - min)).round() as i64
    }
}

fn draw_axes(img: &mut RgbImage, area: &PlotArea) {
    canvas::line(img, (area.left, area.bottom), (area.right, area.bottom), 1, BLACK);
    canvas::line(img, (area.left, area.top), (area.left, area.bottom), 1, BLACK);
}

/// One tick per day; the first day of a month gets a taller tick
fn draw_day_ticks(img: &mut RgbImage, area: &PlotArea, points: &[Point]) {
    for (i, point) in points.iter().enumerate() {
        let x = area.x(i, points.len());
        let len = if point.date.day() == 1 { 10 } else { 5 };
        canvas::line(img, (x, area.bottom), (x, area.bottom + len), 1, BLACK);
    }
}

fn draw_series(img: &mut RgbImage, area: &PlotArea, points: &[Point], color: Rgb<u8>) {
    let range = series::value_range(points);
    let pixels: Vec<(i64, i64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (area.x(i, points.len()), area.y(p.value, range)))
        .collect();

    match pixels.as_slice() {
        [] => {}
        [single] => canvas::line(img, *single, *single, 3, color),
        _ => {
            for pair in pixels.windows(2) {
                canvas::line(img, pair[0], pair[1], 2, color);
            }
        }
    }
}

/// Stroke colour derived from the label, dark enough to show on white
fn label_color(label: &str) -> Rgb<u8> {
    let digest = Sha256::digest(label.as_bytes());
    Rgb([digest[0] / 2, digest[1] / 2, digest[2] / 2])
}
