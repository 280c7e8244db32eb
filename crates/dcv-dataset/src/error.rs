//! Error types for dataset access

use std::path::PathBuf;

/// Errors opening or reading a dataset
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// No data known for the resource
    #[error("no dataset for resource {0}")]
    NotFound(String),

    /// File exists but cannot be interpreted
    #[error("unreadable dataset {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    /// Feature not present in the dataset
    #[error("feature not available: {0}")]
    MissingFeature(String),

    /// Per-event access past the end of a feature
    #[error("event {index} out of range for '{feature}' ({len} events)")]
    IndexOutOfRange {
        feature: String,
        index: usize,
        len: usize,
    },

    /// Column lengths or frame sizes disagree
    #[error("inconsistent dataset shape: {0}")]
    Shape(String),

    /// Upload not yet complete after the readiness wait
    #[error("resource {resource_id} not ready after {waited_ms} ms")]
    NotReady { resource_id: String, waited_ms: u64 },

    /// IO failure
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DatasetError {
    /// Create unreadable-file error
    pub fn unreadable(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Unreadable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
