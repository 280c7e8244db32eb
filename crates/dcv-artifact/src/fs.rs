//! Filesystem-backed artifact store
//!
//! Objects live at `<root>/<bucket>/<kind>/<rid[..3]>/<rid[3..6]>/<rid[6..]>`.
//! Uploads are written to a temporary file in the destination directory and
//! renamed into place, so readers never see partial content.

use crate::key::ArtifactKey;
use crate::presign::Presigner;
use crate::store::{ArtifactStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Filesystem artifact store
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
    presigner: Presigner,
}

impl FsArtifactStore {
    /// Create a store rooted at `root`, signing links with `presigner`
    pub fn new(root: impl Into<PathBuf>, presigner: Presigner) -> Self {
        Self {
            root: root.into(),
            presigner,
        }
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Signer for links to this store's objects
    #[inline]
    #[must_use]
    pub fn presigner(&self) -> &Presigner {
        &self.presigner
    }

    /// Local path of an object
    #[must_use]
    pub fn object_path(&self, key: &ArtifactKey) -> PathBuf {
        let mut path = self.root.join(self.presigner.bucket());
        for segment in key.object_name().split('/') {
            path.push(segment);
        }
        path
    }

    /// Read an object back
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when absent, IO errors otherwise
    pub async fn read(&self, key: &ArtifactKey) -> StoreResult<Vec<u8>> {
        let path = self.object_path(key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(key.clone())),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

fn write_atomically(path: &Path, data: &[u8], overwrite: bool) -> Result<bool, std::io::Error> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("object path has no parent"))?;
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".upload-")
        .tempfile_in(parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;

    if overwrite {
        tmp.persist(path).map_err(|e| e.error)?;
        return Ok(true);
    }
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn is_available(&self) -> bool {
        tokio::fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn exists(&self, key: &ArtifactKey) -> StoreResult<bool> {
        let path = self.object_path(key);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(path, e))
    }

    async fn upload(&self, key: &ArtifactKey, data: &[u8], overwrite: bool) -> StoreResult<()> {
        if !self.is_available().await {
            return Err(StoreError::Unavailable(format!(
                "store root {} is not a directory",
                self.root.display()
            )));
        }
        let path = self.object_path(key);
        let owned = data.to_vec();
        let target = path.clone();
        let written = tokio::task::spawn_blocking(move || write_atomically(&target, &owned, overwrite))
            .await
            .map_err(|e| StoreError::io(&path, std::io::Error::other(e)))?
            .map_err(|e| StoreError::io(&path, e))?;

        if !written {
            debug!(artifact = %key, "object exists, upload without overwrite skipped");
            return Err(StoreError::AlreadyExists(key.clone()));
        }
        info!(artifact = %key, bytes = data.len(), path = %path.display(), "uploaded artifact");
        Ok(())
    }

    async fn presigned_url(
        &self,
        key: &ArtifactKey,
        filename: &str,
        expiration_secs: u64,
    ) -> StoreResult<String> {
        if !self.exists(key).await? {
            return Err(StoreError::NotFound(key.clone()));
        }
        Ok(self
            .presigner
            .sign(&key.object_name(), filename, expiration_secs))
    }
}
