//! Resource records
//!
//! A [`Resource`] is one uploaded file inside an owning dataset ("package").
//! Identity never changes; the only mutation this system performs is filling
//! in an inferred mimetype.

use crate::mimetype::{is_dc_mimetype, mimetype_for_name};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One uploaded scientific-data file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Opaque unique identifier
    pub id: String,
    /// File name as uploaded
    pub name: String,
    /// Mimetype recorded at upload, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    /// Owning dataset
    #[serde(default)]
    pub package_id: String,
    /// Ordinal within the owning dataset
    #[serde(default)]
    pub position: u32,
    /// Upload size in bytes, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Whether the file has been mirrored to the object store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_available: Option<bool>,
}

impl Resource {
    /// Create a resource record
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        package_id: impl Into<String>,
        position: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mimetype: None,
            package_id: package_id.into(),
            position,
            size: None,
            s3_available: None,
        }
    }

    /// With an explicit mimetype
    #[must_use]
    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    /// With upload size
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// With object-store availability flag
    #[must_use]
    pub fn with_s3_available(mut self, available: bool) -> Self {
        self.s3_available = Some(available);
        self
    }

    /// Fill in the mimetype from the file suffix when none was recorded
    pub fn ensure_mimetype(&mut self) {
        if self.mimetype.is_none() {
            self.mimetype = mimetype_for_name(&self.name).map(str::to_string);
        }
    }

    /// Recorded mimetype, or the one inferred from the file suffix
    #[must_use]
    pub fn effective_mimetype(&self) -> Option<&str> {
        self.mimetype
            .as_deref()
            .or_else(|| mimetype_for_name(&self.name))
    }

    /// Whether this resource holds recognized scientific data
    #[must_use]
    pub fn is_dc_data(&self) -> bool {
        self.effective_mimetype().is_some_and(is_dc_mimetype)
    }

    /// File name without its last suffix
    #[must_use]
    pub fn name_stem(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map_or(self.name.as_str(), |(stem, _)| stem)
    }
}

/// Location of a resource's upload below a storage root
///
/// Uploads are sharded like artifacts: `resources/<id[..3]>/<id[3..6]>/<id[6..]>`.
/// Returns `None` for identifiers too short to shard or containing path
/// separators.
#[must_use]
pub fn resource_path(storage_root: &Path, resource_id: &str) -> Option<PathBuf> {
    let usable = resource_id.len() >= 7
        && resource_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-');
    if !usable {
        return None;
    }
    Some(
        storage_root
            .join("resources")
            .join(&resource_id[..3])
            .join(&resource_id[3..6])
            .join(&resource_id[6..]),
    )
}
