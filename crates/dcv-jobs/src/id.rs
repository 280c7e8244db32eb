//! Job identity
//!
//! Job ids are derived from the resource's owning dataset and ordinal, so
//! every creation event for the same resource maps to the same id.

use dcv_dataset::Resource;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// What a job produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Preview image
    Preview,
    /// Condensed dataset
    Condense,
}

impl JobKind {
    /// Suffix used in job ids
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Condense => "condense",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap an arbitrary id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `"{package_id}_{position}_{kind}"`
    #[must_use]
    pub fn derive(package_id: &str, position: u32, kind: JobKind) -> Self {
        Self(format!("{package_id}_{position}_{kind}"))
    }

    /// Id of the `kind` job for a resource
    #[must_use]
    pub fn for_resource(resource: &Resource, kind: JobKind) -> Self {
        Self::derive(&resource.package_id, resource.position, kind)
    }

    /// As string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
