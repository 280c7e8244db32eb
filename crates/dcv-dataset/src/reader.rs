//! Opening datasets for resources

use crate::dataset::{Dataset, MemoryDataset};
use crate::error::DatasetError;
use crate::resource::Resource;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Opens the dataset behind a resource
///
/// The returned handle is owned by the caller; dropping it releases any
/// file the reader opened.
#[async_trait]
pub trait DatasetReader: Send + Sync {
    /// Open the dataset of `resource`
    async fn open(&self, resource: &Resource) -> Result<Box<dyn Dataset>, DatasetError>;
}

/// Reader serving in-memory datasets keyed by resource id
#[derive(Debug, Default)]
pub struct MemoryDatasetReader {
    datasets: DashMap<String, MemoryDataset>,
    opens: AtomicUsize,
}

impl MemoryDatasetReader {
    /// Empty reader
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the dataset of a resource
    pub fn insert(&self, resource_id: impl Into<String>, dataset: MemoryDataset) {
        self.datasets.insert(resource_id.into(), dataset);
    }

    /// Register a dataset, builder style
    #[must_use]
    pub fn with_dataset(self, resource_id: impl Into<String>, dataset: MemoryDataset) -> Self {
        self.insert(resource_id, dataset);
        self
    }

    /// Number of successful `open` calls
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetReader for MemoryDatasetReader {
    async fn open(&self, resource: &Resource) -> Result<Box<dyn Dataset>, DatasetError> {
        let dataset = self
            .datasets
            .get(&resource.id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DatasetError::NotFound(resource.id.clone()))?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            resource_id = %resource.id,
            events = dataset.event_count(),
            "opened in-memory dataset"
        );
        Ok(Box::new(dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_known_resource() {
        let reader = MemoryDatasetReader::new().with_dataset("abcdef123", MemoryDataset::new(3));
        let res = Resource::new("abcdef123", "a.rtdc", "pkg", 0);
        let ds = reader.open(&res).await.unwrap();
        assert_eq!(ds.event_count(), 3);
        assert_eq!(reader.open_count(), 1);
    }

    #[tokio::test]
    async fn open_unknown_resource() {
        let reader = MemoryDatasetReader::new();
        let res = Resource::new("abcdef123", "a.rtdc", "pkg", 0);
        assert!(matches!(reader.open(&res).await, Err(DatasetError::NotFound(_))));
        assert_eq!(reader.open_count(), 0);
    }
}
