//! Error types for the render cache

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Error returned by a [`Renderer`](crate::Renderer) implementation
pub type RenderFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for render cache operations
///
/// Sources are held behind `Arc` so a single in-flight render can hand the
/// same error to every caller waiting on it.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum Error {
    /// A request parameter was malformed
    #[error("Invalid {field}: {message}")]
    #[diagnostic(
        code(chartcache::cache::invalid_input),
        help("count must be a non-negative integer and date must be written as YYYY-MM-DD")
    )]
    InvalidInput {
        /// Name of the offending parameter
        field: &'static str,
        /// What was wrong with it
        message: String,
    },

    /// The artifact directory could not be created, read or written
    #[error("Storage {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(chartcache::cache::storage),
        help("Check that the cache directory exists and is writable")
    )]
    Storage {
        /// The underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "create_dir_all", "persist")
        operation: String,
    },

    /// The renderer failed for a valid request
    #[error("Rendering artifact {key} failed: {source}")]
    #[diagnostic(code(chartcache::cache::render))]
    Render {
        /// Cache key of the artifact being rendered
        key: String,
        /// The renderer's own error
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Configuration or validation error
    #[error("Cache configuration error: {message}")]
    #[diagnostic(code(chartcache::cache::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },
}

impl Error {
    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Create a storage error with path context
    #[must_use]
    pub fn storage(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Storage {
            source: Arc::new(source),
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create a render error wrapping the renderer's failure
    #[must_use]
    pub fn render(key: impl Into<String>, source: RenderFailure) -> Self {
        Self::Render {
            key: key.into(),
            source: Arc::from(source),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Whether this error came from the renderer
    #[must_use]
    pub const fn is_render(&self) -> bool {
        matches!(self, Self::Render { .. })
    }

    /// Whether this error came from the artifact directory
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

/// Result type for render cache operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_invalid_input_message() {
        let err = Error::invalid_input("date", "expected YYYY-MM-DD, got \"01/02/2024\"");
        assert!(err.to_string().contains("Invalid date"));
        assert!(err.to_string().contains("01/02/2024"));
    }

    #[test]
    fn test_storage_error_includes_path() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::storage(io, "/cache/plots", "create_dir_all");
        assert!(err.is_storage());
        assert!(err.to_string().contains("create_dir_all"));
        assert!(err.to_string().contains("/cache/plots"));
    }

    #[test]
    fn test_render_error_keeps_source() {
        let failure: RenderFailure = "canvas too small".into();
        let err = Error::render("abc123", failure);
        assert!(err.is_render());
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "canvas too small");
    }

    #[test]
    fn test_clone_shares_source() {
        let failure: RenderFailure = "boom".into();
        let err = Error::render("k", failure);
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
