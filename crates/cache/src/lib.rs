//! Content-addressed render cache for chartcache
//!
//! This crate maps chart requests to rendered image files:
//! - Deterministic cache keys derived from the request and a salt
//! - A directory of artifacts, written atomically on first miss
//! - An in-memory memo with a TTL in front of the directory
//! - Single-flight resolution so concurrent identical misses render once
//!
//! # Overview
//!
//! ```text
//! RenderCache::get(request)
//!   -> memo (request -> artifact, TTL)
//!   -> KeyDeriver::derive(request)      sha256 of canonical envelope
//!   -> ArtifactStore::resolve(key)      exists on disk?
//!   -> Renderer::render(request)        only on a miss
//! ```
//!
//! The memo is a performance layer only: dropping it (or restarting the
//! process) falls back to the on-disk check and never changes results.

#![expect(
    clippy::missing_errors_doc,
    reason = "every fallible function returns the crate Error, documented on the enum"
)]

pub mod clock;
pub mod config;
mod error;
pub mod key;
pub mod memo;
mod render;
pub mod request;
pub mod store;

// Re-export error types at crate root
pub use error::{Error, RenderFailure, Result};

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use key::{CacheKey, Envelope, KeyDeriver};
pub use memo::{CacheStats, RenderCache};
pub use render::Renderer;
pub use request::RenderRequest;
pub use store::{ArtifactRef, ArtifactStore, Resolved};
