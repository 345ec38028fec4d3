//! Directory-backed artifact storage
//!
//! Artifacts live flat in a single directory, one file per cache key:
//!
//! ```text
//! <root>/
//!   plot_3f9a...e1.png
//!   plot_b07c...42.png
//! ```
//!
//! Files are written once through a temporary file in the same directory and
//! renamed into place, so a reader never observes a partially written image.
//! Nothing here deletes artifacts.

use crate::{CacheKey, Error, RenderFailure, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "plot_";
const FILE_EXTENSION: &str = "png";

/// A persisted artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef {
    /// The key the artifact is stored under
    pub key: CacheKey,
    /// Path of the artifact file
    pub path: PathBuf,
}

impl ArtifactRef {
    /// File name of the artifact within the store directory
    #[must_use]
    pub fn file_name(&self) -> String {
        file_name_for(&self.key)
    }

    /// Read the artifact's bytes
    pub fn read(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|e| Error::storage(e, &self.path, "read"))
    }
}

/// Outcome of [`ArtifactStore::resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The artifact on disk
    pub artifact: ArtifactRef,
    /// Whether the producer ran to create it
    pub rendered: bool,
}

/// Maps cache keys to image files under one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open a store, creating the directory and its parents if needed
    ///
    /// Opening an existing directory is not an error.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::storage(e, &root, "create_dir_all"))?;
        Ok(Self { root })
    }

    /// The directory artifacts are stored in
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an artifact for `key` is (or would be) stored at
    #[must_use]
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(file_name_for(key))
    }

    /// Look up an existing artifact without producing one
    #[must_use]
    pub fn lookup(&self, key: &CacheKey) -> Option<ArtifactRef> {
        let path = self.path_for(key);
        path.is_file().then(|| ArtifactRef {
            key: key.clone(),
            path,
        })
    }

    /// Return the artifact for `key`, producing and persisting it on a miss
    pub fn get_or_create<F>(&self, key: &CacheKey, produce: F) -> Result<ArtifactRef>
    where
        F: FnOnce() -> std::result::Result<Vec<u8>, RenderFailure>,
    {
        self.resolve(key, produce).map(|resolved| resolved.artifact)
    }

    /// Like [`get_or_create`](Self::get_or_create), also reporting whether
    /// `produce` ran
    ///
    /// A failing producer leaves nothing on disk.
    pub fn resolve<F>(&self, key: &CacheKey, produce: F) -> Result<Resolved>
    where
        F: FnOnce() -> std::result::Result<Vec<u8>, RenderFailure>,
    {
        if let Some(artifact) = self.lookup(key) {
            tracing::debug!(key = %key, path = %artifact.path.display(), "artifact found on disk");
            return Ok(Resolved {
                artifact,
                rendered: false,
            });
        }

        let bytes = produce().map_err(|e| Error::render(key.as_str(), e))?;
        let path = self.path_for(key);
        self.write_atomic(&path, &bytes)?;
        tracing::info!(key = %key, path = %path.display(), bytes = bytes.len(), "artifact stored");

        Ok(Resolved {
            artifact: ArtifactRef {
                key: key.clone(),
                path,
            },
            rendered: true,
        })
    }

    /// List the artifacts currently on disk, sorted by key
    ///
    /// Temporary files and files not named like artifacts are skipped.
    pub fn list(&self) -> Result<Vec<ArtifactRef>> {
        let entries =
            fs::read_dir(&self.root).map_err(|e| Error::storage(e, &self.root, "read_dir"))?;

        let mut artifacts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::storage(e, &self.root, "read_dir_entry"))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(key) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(key_from_file_name)
            else {
                continue;
            };
            artifacts.push(ArtifactRef { key, path });
        }
        artifacts.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(artifacts)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        // The temp file lives beside the target so the final rename stays on
        // one filesystem; it is removed on drop if anything below fails.
        let mut tmp = tempfile::Builder::new()
            .prefix(".plot-")
            .suffix(".tmp")
            .tempfile_in(&self.root)
            .map_err(|e| Error::storage(e, &self.root, "create_temp"))?;
        tmp.write_all(bytes)
            .map_err(|e| Error::storage(e, tmp.path(), "write"))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| Error::storage(e, tmp.path(), "sync"))?;
        tmp.persist(path)
            .map_err(|e| Error::storage(e.error, path, "persist"))?;
        Ok(())
    }
}

fn file_name_for(key: &CacheKey) -> String {
    format!("{FILE_PREFIX}{key}.{FILE_EXTENSION}")
}

fn key_from_file_name(name: &str) -> Option<CacheKey> {
    let hex = name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_EXTENSION)?
        .strip_suffix('.')?;
    CacheKey::from_hex(hex)
}
