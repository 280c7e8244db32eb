//! In-process artifact store
//!
//! Keeps objects in a concurrent map. Replacing an entry swaps the whole
//! payload, so readers never observe a partially written object. Operation
//! counters make the store useful for verifying at-most-once behavior.

use crate::hash::ContentHash;
use crate::key::ArtifactKey;
use crate::presign::Presigner;
use crate::store::{ArtifactStore, StoreError, StoreResult};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// A stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Payload
    pub data: Arc<[u8]>,
    /// Digest of the payload
    pub digest: ContentHash,
}

/// Per-operation call counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Calls to `exists`
    pub exists_calls: usize,
    /// Calls to `upload` that wrote an object
    pub uploads: usize,
    /// Calls to `presigned_url`
    pub presigns: usize,
}

/// Concurrent in-memory store
#[derive(Debug)]
pub struct MemoryArtifactStore {
    objects: DashMap<ArtifactKey, StoredObject>,
    available: AtomicBool,
    exists_calls: AtomicUsize,
    uploads: AtomicUsize,
    presigns: AtomicUsize,
    presigner: Presigner,
}

impl MemoryArtifactStore {
    /// Create an empty, available store
    #[must_use]
    pub fn new() -> Self {
        Self::with_presigner(Presigner::new("memory://objects", "dcview", b"memory store"))
    }

    /// Create an empty store signing links with `presigner`
    #[must_use]
    pub fn with_presigner(presigner: Presigner) -> Self {
        Self {
            objects: DashMap::new(),
            available: AtomicBool::new(true),
            exists_calls: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
            presigns: AtomicUsize::new(0),
            presigner,
        }
    }

    /// Toggle reachability
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Fetch an object
    #[must_use]
    pub fn get(&self, key: &ArtifactKey) -> Option<StoredObject> {
        self.objects.get(key).map(|entry| entry.value().clone())
    }

    /// Number of stored objects
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no objects
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Call counters
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            exists_calls: self.exists_calls.load(Ordering::SeqCst),
            uploads: self.uploads.load(Ordering::SeqCst),
            presigns: self.presigns.load(Ordering::SeqCst),
        }
    }

    /// The signer used for presigned links
    #[must_use]
    pub fn presigner(&self) -> &Presigner {
        &self.presigner
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store switched off".to_string()))
        }
    }
}

impl Default for MemoryArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn exists(&self, key: &ArtifactKey) -> StoreResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;
        Ok(self.objects.contains_key(key))
    }

    async fn upload(&self, key: &ArtifactKey, data: &[u8], overwrite: bool) -> StoreResult<()> {
        self.ensure_available()?;
        let object = StoredObject {
            data: Arc::from(data),
            digest: ContentHash::compute(data),
        };
        match self.objects.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) if !overwrite => {
                return Err(StoreError::AlreadyExists(key.clone()));
            }
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                entry.insert(object);
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(object);
            }
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(artifact = %key, bytes = data.len(), "stored artifact in memory");
        Ok(())
    }

    async fn presigned_url(
        &self,
        key: &ArtifactKey,
        filename: &str,
        expiration_secs: u64,
    ) -> StoreResult<String> {
        self.presigns.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;
        if !self.objects.contains_key(key) {
            return Err(StoreError::NotFound(key.clone()));
        }
        Ok(self
            .presigner
            .sign(&key.object_name(), filename, expiration_secs))
    }
}
