//! Cache configuration and cache directory resolution

use crate::memo::{DEFAULT_MEMO_CAPACITY, DEFAULT_TTL};
use crate::{ArtifactStore, Error, RenderCache, Renderer, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the cache directory
pub const CACHE_DIR_ENV: &str = "CHARTCACHE_CACHE_DIR";

/// Settings for building a [`RenderCache`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Artifact directory; resolved from the environment when unset
    pub cache_dir: Option<PathBuf>,
    /// Lifetime of memo entries in seconds
    pub ttl_secs: u64,
    /// Maximum number of memo entries
    pub memo_capacity: usize,
    /// Key salt; the renderer's fingerprint when unset
    pub salt: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            ttl_secs: DEFAULT_TTL.as_secs(),
            memo_capacity: DEFAULT_MEMO_CAPACITY,
            salt: None,
        }
    }
}

impl CacheConfig {
    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source)
            .map_err(|e| Error::configuration(format!("Invalid cache configuration: {e}")))
    }

    /// Load a TOML configuration file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Memo lifetime as a [`Duration`]
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Directories the artifact store may live in, most preferred first
    ///
    /// A configured `cache_dir` is the only candidate. Otherwise
    /// `CHARTCACHE_CACHE_DIR`, then `chartcache/plots` under the user cache
    /// directory, then under the system temp directory.
    #[must_use]
    pub fn cache_dir_candidates(&self) -> Vec<PathBuf> {
        match &self.cache_dir {
            Some(dir) if !dir.as_os_str().is_empty() => vec![dir.clone()],
            _ => default_candidates(
                std::env::var_os(CACHE_DIR_ENV),
                dirs::cache_dir(),
                std::env::temp_dir(),
            ),
        }
    }

    /// Open the artifact store in the first candidate directory that can be
    /// created
    pub fn open_store(&self) -> Result<ArtifactStore> {
        open_first(self.cache_dir_candidates())
    }

    /// Open the artifact store and build a cache around `renderer`
    pub fn build<R: Renderer>(&self, renderer: R) -> Result<RenderCache<R>> {
        let store = self.open_store()?;
        let cache = RenderCache::new(store, renderer, self.ttl(), self.memo_capacity)?;
        Ok(match &self.salt {
            Some(salt) => cache.with_salt(salt.clone()),
            None => cache,
        })
    }
}

const PLOTS_SUBDIR: &str = "chartcache/plots";

fn default_candidates(
    env_override: Option<OsString>,
    user_cache: Option<PathBuf>,
    temp: PathBuf,
) -> Vec<PathBuf> {
    env_override
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .into_iter()
        .chain(user_cache.map(|dir| dir.join(PLOTS_SUBDIR)))
        .chain(std::iter::once(temp.join(PLOTS_SUBDIR)))
        .collect()
}

/// The store for the first candidate that opens, or the last failure
fn open_first(candidates: Vec<PathBuf>) -> Result<ArtifactStore> {
    let mut last_err = None;
    for dir in candidates {
        match ArtifactStore::open(dir.clone()) {
            Ok(store) => return Ok(store),
            Err(e) => {
                tracing::debug!(path = %dir.display(), error = %e, "cache directory unusable");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| Error::configuration("No cache directory to try")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RenderFailure;
    use crate::RenderRequest;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn constant(_: &RenderRequest) -> std::result::Result<Vec<u8>, RenderFailure> {
        Ok(vec![7])
    }

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(60));
        assert_eq!(config.memo_capacity, DEFAULT_MEMO_CAPACITY);
        assert!(config.salt.is_none());
    }

    #[test]
    fn test_toml_partial_document_keeps_defaults() {
        let config = CacheConfig::from_toml_str("ttl_secs = 5\nsalt = \"chart-v2\"\n").unwrap();
        assert_eq!(config.ttl_secs, 5);
        assert_eq!(config.salt.as_deref(), Some("chart-v2"));
        assert_eq!(config.memo_capacity, DEFAULT_MEMO_CAPACITY);
    }

    #[test]
    fn test_toml_unknown_field_is_rejected() {
        let err = CacheConfig::from_toml_str("ttl = 5\n").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_from_toml_file_missing() {
        let temp = TempDir::new().unwrap();
        let err = CacheConfig::from_toml_file(&temp.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_configured_dir_is_the_only_candidate() {
        let config = CacheConfig {
            cache_dir: Some(PathBuf::from("/srv/plots")),
            ..CacheConfig::default()
        };
        assert_eq!(config.cache_dir_candidates(), vec![PathBuf::from("/srv/plots")]);
    }

    #[test]
    fn test_default_candidate_order() {
        let candidates = default_candidates(
            Some(OsString::from("/override")),
            Some(PathBuf::from("/home/u/.cache")),
            PathBuf::from("/tmp"),
        );
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/override"),
                PathBuf::from("/home/u/.cache/chartcache/plots"),
                PathBuf::from("/tmp/chartcache/plots"),
            ]
        );
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let candidates = default_candidates(Some(OsString::new()), None, PathBuf::from("/tmp"));
        assert_eq!(candidates, vec![PathBuf::from("/tmp/chartcache/plots")]);
    }

    #[test]
    fn test_blocked_candidate_falls_through() {
        let temp = TempDir::new().unwrap();
        // A regular file where the preferred directory's parent should be
        let blocked = temp.path().join("blocked");
        std::fs::write(&blocked, b"file").unwrap();

        let fallback = temp.path().join("fallback");
        let store = open_first(vec![blocked.join("plots"), fallback.clone()]).unwrap();
        assert_eq!(store.root(), fallback);
        assert!(fallback.is_dir());
    }

    #[test]
    fn test_all_candidates_blocked_reports_storage() {
        let temp = TempDir::new().unwrap();
        let blocked = temp.path().join("blocked");
        std::fs::write(&blocked, b"file").unwrap();

        let err = open_first(vec![blocked.join("a"), blocked.join("b")]).unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn test_build_applies_salt_and_dir() {
        let temp = TempDir::new().unwrap();
        let config = CacheConfig {
            cache_dir: Some(temp.path().join("plots")),
            ttl_secs: 1,
            memo_capacity: 4,
            salt: Some("pinned".to_string()),
        };
        let cache = config.build(constant).unwrap();
        assert_eq!(cache.deriver().salt(), "pinned");
        assert_eq!(cache.store().root(), temp.path().join("plots"));
        assert_eq!(cache.ttl(), Duration::from_secs(1));

        let request = RenderRequest::new(1, "x", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(cache.get(&request).unwrap().read().unwrap(), vec![7]);
    }

    #[test]
    fn test_build_rejects_zero_capacity() {
        let temp = TempDir::new().unwrap();
        let config = CacheConfig {
            cache_dir: Some(temp.path().to_path_buf()),
            memo_capacity: 0,
            ..CacheConfig::default()
        };
        assert!(config.build(constant).is_err());
    }

    #[test]
    fn test_build_rejects_out_of_range_ttl() {
        let temp = TempDir::new().unwrap();
        let config = CacheConfig {
            cache_dir: Some(temp.path().to_path_buf()),
            ttl_secs: u64::MAX,
            ..CacheConfig::default()
        };
        let err = config.build(constant).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
