//! The rendering seam consumed by the cache

use crate::{RenderFailure, RenderRequest};

/// Produces image bytes for a request
///
/// Implementations must be deterministic for a fixed request: the cache
/// stores the first result and serves it for every later identical request.
pub trait Renderer: Send + Sync {
    /// Render the chart for `request`
    fn render(&self, request: &RenderRequest) -> Result<Vec<u8>, RenderFailure>;

    /// Version of the rendering logic, used as the default key salt
    ///
    /// Bump it whenever the output for an existing request would change.
    fn fingerprint(&self) -> &str {
        ""
    }
}

impl<F> Renderer for F
where
    F: Fn(&RenderRequest) -> Result<Vec<u8>, RenderFailure> + Send + Sync,
{
    fn render(&self, request: &RenderRequest) -> Result<Vec<u8>, RenderFailure> {
        self(request)
    }
}
