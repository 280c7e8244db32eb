//! Object-store contract for derived artifacts
//!
//! [`ArtifactStore`] is the only shared mutable resource between jobs.
//! Implementations must make [`ArtifactStore::upload`] atomic: a reader
//! either sees the previous object, no object, or the complete new one.

use crate::key::{ArtifactKey, KeyError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Errors reported by artifact stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend not reachable
    #[error("artifact store unavailable: {0}")]
    Unavailable(String),

    /// Upload without `override` hit an existing object
    #[error("artifact already exists: {0}")]
    AlreadyExists(ArtifactKey),

    /// Object does not exist
    #[error("artifact not found: {0}")]
    NotFound(ArtifactKey),

    /// Invalid key
    #[error(transparent)]
    Key(#[from] KeyError),

    /// IO failure on a path
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value object store addressed by `(resource_id, kind)`
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Whether the backend is reachable
    async fn is_available(&self) -> bool;

    /// Whether an artifact is currently stored under `key`
    async fn exists(&self, key: &ArtifactKey) -> StoreResult<bool>;

    /// Store `data` under `key`
    ///
    /// With `overwrite == false` an existing object is left untouched and
    /// [`StoreError::AlreadyExists`] is returned.
    async fn upload(&self, key: &ArtifactKey, data: &[u8], overwrite: bool) -> StoreResult<()>;

    /// Time-limited link to the object, carrying a download filename
    async fn presigned_url(
        &self,
        key: &ArtifactKey,
        filename: &str,
        expiration_secs: u64,
    ) -> StoreResult<String>;

    /// Upload the contents of a local file
    async fn upload_file(&self, key: &ArtifactKey, path: &Path, overwrite: bool) -> StoreResult<()> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::io(path, e))?;
        self.upload(key, &data, overwrite).await
    }
}
