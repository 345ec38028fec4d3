//! Chart rendering for chartcache
//!
//! Provides [`ChartRenderer`], the [`Renderer`](chartcache_cache::Renderer)
//! used in production: a deterministic PNG line chart of
//! `1 + sin(count + i) + i / 10` over `count` consecutive days.

mod canvas;
pub mod chart;
pub mod error;
pub mod series;

pub use chart::{ChartOptions, ChartRenderer, FINGERPRINT};
pub use error::{ChartError, Result};
pub use series::{Point, series};
