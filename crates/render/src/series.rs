//! The plotted data series

use crate::error::{ChartError, Result};
use chartcache_cache::RenderRequest;
use chrono::{Days, NaiveDate};

/// One plotted point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Day on the x axis
    pub date: NaiveDate,
    /// Value on the y axis
    pub value: f64,
}

/// Points for `request`: one per day starting at its date, with value
/// `1 + sin(count + i) + i / 10`
pub fn series(request: &RenderRequest) -> Result<Vec<Point>> {
    let count = request.count();
    let start = request.date();

    (0..count)
        .map(|i| {
            let days = u64::from(i);
            let date = start
                .checked_add_days(Days::new(days))
                .ok_or(ChartError::DateOutOfRange { start, days })?;
            let value = 1.0 + (f64::from(count) + f64::from(i)).sin() + f64::from(i) / 10.0;
            Ok(Point { date, value })
        })
        .collect()
}

/// Smallest and largest value, padded when the series is flat
#[must_use]
pub fn value_range(points: &[Point]) -> (f64, f64) {
    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.value), hi.max(p.value))
        });
    if points.is_empty() {
        (0.0, 1.0)
    } else if (max - min).abs() < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        (min, max)
    }
}
