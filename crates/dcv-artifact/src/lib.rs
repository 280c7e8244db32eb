//! DC View Artifact Storage
//!
//! Derived artifacts (rendered previews, condensed datasets) addressed by the
//! resource they were computed from.
//!
//! # Core Concepts
//!
//! - [`ArtifactKey`]: `(resource_id, kind)` address with sharded object names
//! - [`ArtifactStore`]: async store contract (exists, atomic upload, presigned links)
//! - [`MemoryArtifactStore`] / [`FsArtifactStore`]: concrete backends
//! - [`Presigner`]: time-limited signed links
//! - [`ContentHash`]: Blake3 digests of stored payloads
//!
//! # Example
//!
//! ```rust,ignore
//! use dcv_artifact::{ArtifactKey, ArtifactStore, MemoryArtifactStore};
//!
//! let store = MemoryArtifactStore::new();
//! let key = ArtifactKey::preview(resource_id)?;
//! if !store.exists(&key).await? {
//!     store.upload(&key, &jpeg, false).await?;
//! }
//! let url = store.presigned_url(&key, "beads_preview.jpg", 3600).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod fs;
mod hash;
mod key;
mod memory;
mod presign;
mod store;

pub use fs::FsArtifactStore;
pub use hash::{ContentHash, HashError};
pub use key::{ArtifactKey, ArtifactKind, KeyError};
pub use memory::{MemoryArtifactStore, StoreStats, StoredObject};
pub use presign::{Presigner, SignedLink};
pub use store::{ArtifactStore, StoreError, StoreResult};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
