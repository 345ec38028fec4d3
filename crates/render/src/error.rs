//! Error types for chart rendering

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur while rendering a chart
#[derive(Error, Debug)]
pub enum ChartError {
    /// The request asks for more points than the renderer draws
    #[error("Chart with {count} points exceeds the limit of {max}")]
    TooManyPoints {
        /// Requested number of points
        count: u32,
        /// Configured maximum
        max: u32,
    },

    /// A plotted day falls outside the representable date range
    #[error("Date {start} plus {days} days is out of range")]
    DateOutOfRange {
        /// First plotted day
        start: NaiveDate,
        /// Offset that overflowed
        days: u64,
    },

    /// Canvas settings leave no room to plot
    #[error("Canvas {width}x{height} is too small for a {margin}px margin")]
    InvalidCanvas {
        /// Canvas width in pixels
        width: u32,
        /// Canvas height in pixels
        height: u32,
        /// Margin around the plot area
        margin: u32,
    },

    /// PNG encoding failed
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Result type for chart rendering
pub type Result<T> = std::result::Result<T, ChartError>;
