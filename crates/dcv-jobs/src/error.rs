//! Error types for DC View jobs
//!
//! Provides error handling for:
//! - Queue bookkeeping (unknown jobs, bad dependencies)
//! - Preview generation failures, classified for batch reporting

use crate::id::JobId;
use dcv_artifact::{KeyError, StoreError};
use dcv_dataset::DatasetError;
use dcv_render::RenderError;
use std::path::PathBuf;

/// Queue errors
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Dependency was never enqueued
    #[error("job {job} depends on unknown job {dependency}")]
    UnknownDependency { job: JobId, dependency: JobId },

    /// Job lists itself as a dependency
    #[error("job {0} depends on itself")]
    SelfDependency(JobId),

    /// Dependency edges would form a cycle
    #[error("dependency cycle through job {0}")]
    CycleDetected(JobId),

    /// No job with this id
    #[error("job not found: {0}")]
    JobNotFound(JobId),
}

/// Reasons a preview job ends in `Failed`
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    /// Upload did not land within the readiness wait
    #[error("resource not ready: {0}")]
    NotReady(#[source] DatasetError),

    /// Resource id cannot address an artifact
    #[error("invalid artifact key: {0}")]
    InvalidKey(#[from] KeyError),

    /// Existence check failed
    #[error("artifact lookup failed: {0}")]
    Lookup(#[source] StoreError),

    /// Dataset could not be opened
    #[error("could not open dataset: {0}")]
    DatasetOpen(#[source] DatasetError),

    /// Renderer returned an error
    #[error("rendering failed: {0}")]
    Render(#[from] RenderError),

    /// Renderer panicked or its task was cancelled
    #[error("renderer aborted: {0}")]
    RenderAborted(String),

    /// Upload failed
    #[error("upload failed: {0}")]
    Upload(#[source] StoreError),

    /// Working directory could not be created or written
    #[error("scratch space error on {path}: {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PreviewError {
    /// Create scratch error for path
    pub fn scratch(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Scratch {
            path: path.into(),
            source,
        }
    }

    /// Stable class label used in batch reports
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::NotReady(_) => "ReadinessTimeout",
            Self::InvalidKey(_) => "InvalidArtifactKey",
            Self::Lookup(_) => "ArtifactLookupFailure",
            Self::DatasetOpen(_) => "DatasetOpenFailure",
            Self::Render(_) | Self::RenderAborted(_) => "RenderFailure",
            Self::Upload(_) => "UploadFailure",
            Self::Scratch { .. } => "ScratchSpaceFailure",
        }
    }

    /// Check if a later run may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotReady(_) | Self::Lookup(_) | Self::Upload(_) | Self::Scratch { .. }
        )
    }
}
