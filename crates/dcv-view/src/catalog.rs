//! Dataset catalog and read access
//!
//! The repository's dataset records are owned elsewhere; this crate only
//! needs to look them up and decide whether a viewer may read them. A
//! [`MemoryCatalog`] loaded from a JSON export backs the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dcv_dataset::Resource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Errors reading the catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Catalog file could not be read
    #[error("cannot read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog file is not valid JSON
    #[error("invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two datasets share an id
    #[error("duplicate dataset id '{0}'")]
    DuplicateDataset(String),

    /// Backend failure
    #[error("catalog backend error: {0}")]
    Backend(String),
}

/// Lifecycle state of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetState {
    /// Published
    #[default]
    Active,
    /// Still being edited by its owners
    Draft,
    /// Removed; kept for reference only
    Deleted,
}

/// A dataset ("package") and its resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Unique id
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// Visible only to its readers
    #[serde(default)]
    pub private: bool,
    /// Lifecycle state
    #[serde(default)]
    pub state: DatasetState,
    /// Last metadata change
    pub metadata_modified: DateTime<Utc>,
    /// Access tokens of members allowed to read
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub readers: Vec<String>,
    /// Uploaded files, in position order
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl DatasetRecord {
    /// Create an active public dataset without resources
    #[must_use]
    pub fn new(id: impl Into<String>, metadata_modified: DateTime<Utc>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            private: false,
            state: DatasetState::Active,
            metadata_modified,
            readers: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Mark private
    #[inline]
    #[must_use]
    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// Set lifecycle state
    #[inline]
    #[must_use]
    pub fn with_state(mut self, state: DatasetState) -> Self {
        self.state = state;
        self
    }

    /// Grant read access to a token holder
    #[must_use]
    pub fn with_reader(mut self, token: impl Into<String>) -> Self {
        self.readers.push(token.into());
        self
    }

    /// Append a resource, assigning its owner and position
    #[must_use]
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self.normalize();
        self
    }

    /// Resource of this dataset by id
    #[must_use]
    pub fn resource(&self, resource_id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == resource_id)
    }

    /// Make every resource point at this dataset, positions in list order
    fn normalize(&mut self) {
        for (position, resource) in self.resources.iter_mut().enumerate() {
            resource.package_id.clone_from(&self.id);
            resource.position = u32::try_from(position).unwrap_or(u32::MAX);
        }
    }
}

/// Who is asking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    token: Option<String>,
}

impl Viewer {
    /// Unauthenticated visitor
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Holder of an access token
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Viewer from an `Authorization` header value (`Bearer` prefix optional)
    #[must_use]
    pub fn from_authorization(header: Option<&str>) -> Self {
        let token = header
            .map(str::trim)
            .map(|h| h.strip_prefix("Bearer ").unwrap_or(h).trim())
            .filter(|t| !t.is_empty());
        Self {
            token: token.map(str::to_string),
        }
    }

    /// Access token, if any
    #[inline]
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// Read-access decision for datasets
pub trait AccessPolicy: Send + Sync {
    /// Whether `viewer` may read `dataset` and its resources
    fn can_read(&self, dataset: &DatasetRecord, viewer: &Viewer) -> bool;
}

/// Public active datasets are open; everything else needs a reader token
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberAccess;

impl AccessPolicy for MemberAccess {
    fn can_read(&self, dataset: &DatasetRecord, viewer: &Viewer) -> bool {
        let is_member = viewer
            .token()
            .is_some_and(|t| dataset.readers.iter().any(|r| r == t));
        match dataset.state {
            DatasetState::Deleted => false,
            DatasetState::Draft => is_member,
            DatasetState::Active => !dataset.private || is_member,
        }
    }
}

/// Lookup of datasets and their resources
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    /// Dataset by id
    async fn dataset(&self, dataset_id: &str) -> Result<Option<DatasetRecord>, CatalogError>;

    /// All datasets, drafts included
    async fn datasets(&self) -> Result<Vec<DatasetRecord>, CatalogError>;
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    datasets: Vec<DatasetRecord>,
}

/// In-memory catalog
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    datasets: BTreeMap<String, DatasetRecord>,
}

impl MemoryCatalog {
    /// Empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a dataset
    pub fn insert(&mut self, mut dataset: DatasetRecord) {
        dataset.normalize();
        self.datasets.insert(dataset.id.clone(), dataset);
    }

    /// With a dataset added
    #[must_use]
    pub fn with_dataset(mut self, dataset: DatasetRecord) -> Self {
        self.insert(dataset);
        self
    }

    /// Number of datasets
    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Parse a `{"datasets": [...]}` export
    ///
    /// # Errors
    /// Invalid JSON or duplicate dataset ids
    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(text)?;
        let mut catalog = Self::new();
        for dataset in file.datasets {
            if catalog.datasets.contains_key(&dataset.id) {
                return Err(CatalogError::DuplicateDataset(dataset.id));
            }
            catalog.insert(dataset);
        }
        Ok(catalog)
    }

    /// Load a JSON export from disk
    ///
    /// # Errors
    /// IO failures and the errors of [`MemoryCatalog::from_json_str`]
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&text)?;
        tracing::info!(path = %path.display(), datasets = catalog.len(), "loaded catalog");
        Ok(catalog)
    }
}

#[async_trait]
impl ResourceCatalog for MemoryCatalog {
    async fn dataset(&self, dataset_id: &str) -> Result<Option<DatasetRecord>, CatalogError> {
        Ok(self.datasets.get(dataset_id).cloned())
    }

    async fn datasets(&self) -> Result<Vec<DatasetRecord>, CatalogError> {
        Ok(self.datasets.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn modified() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn json_export_assigns_owner_and_position() {
        let catalog = MemoryCatalog::from_json_str(
            r#"{"datasets": [{
                "id": "ds-1",
                "private": true,
                "state": "draft",
                "metadata_modified": "2024-03-01T12:00:00Z",
                "readers": ["tok"],
                "resources": [
                    {"id": "aaaaaaa1", "name": "a.rtdc"},
                    {"id": "aaaaaaa2", "name": "b.rtdc", "s3_available": true}
                ]
            }]}"#,
        )
        .unwrap();
        let ds = &catalog.datasets["ds-1"];
        assert_eq!(ds.state, DatasetState::Draft);
        assert_eq!(ds.metadata_modified, modified());
        let b = ds.resource("aaaaaaa2").unwrap();
        assert_eq!((b.package_id.as_str(), b.position), ("ds-1", 1));
        assert_eq!(b.s3_available, Some(true));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = MemoryCatalog::from_json_str(
            r#"{"datasets": [
                {"id": "x", "metadata_modified": "2024-03-01T12:00:00Z"},
                {"id": "x", "metadata_modified": "2024-03-01T12:00:00Z"}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateDataset(id) if id == "x"));
    }

    #[test]
    fn member_access_rules() {
        let policy = MemberAccess;
        let member = Viewer::with_token("tok");
        let stranger = Viewer::with_token("other");
        let anon = Viewer::anonymous();

        let public = DatasetRecord::new("p", modified());
        assert!(policy.can_read(&public, &anon));

        let private = DatasetRecord::new("q", modified()).with_private(true).with_reader("tok");
        assert!(policy.can_read(&private, &member));
        assert!(!policy.can_read(&private, &stranger));
        assert!(!policy.can_read(&private, &anon));

        let draft = DatasetRecord::new("d", modified()).with_state(DatasetState::Draft).with_reader("tok");
        assert!(!policy.can_read(&draft, &anon));
        assert!(policy.can_read(&draft, &member));

        let deleted = public.with_state(DatasetState::Deleted);
        assert!(!policy.can_read(&deleted, &anon));
    }

    #[test]
    fn authorization_header_parsing() {
        assert_eq!(Viewer::from_authorization(Some("Bearer abc")).token(), Some("abc"));
        assert_eq!(Viewer::from_authorization(Some("abc")).token(), Some("abc"));
        assert_eq!(Viewer::from_authorization(Some("  ")), Viewer::anonymous());
        assert_eq!(Viewer::from_authorization(None), Viewer::anonymous());
    }
}
