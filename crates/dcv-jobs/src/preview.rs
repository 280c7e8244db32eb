//! Preview generation job
//!
//! [`PreviewJob::run`] decides whether a resource needs a preview, renders it
//! off the async executor and uploads it. Every path returns a
//! [`PreviewOutcome`]; nothing is raised to the queue.
//!
//! Order of checks:
//! 1. store reachable, else `Unavailable`
//! 2. recognized scientific-data mimetype, else `Skipped(Ineligible)`
//! 3. bounded wait for the upload to land
//! 4. unless overriding, an existing preview means `Skipped(AlreadyPresent)`
//! 5. open dataset, render, write to a per-job scratch directory, upload
//!
//! The scratch directory and the dataset handle are scoped to the run and
//! released on every exit path.

use crate::error::PreviewError;
use crate::scratch::ScratchSpace;
use dcv_artifact::{ArtifactKey, ArtifactStore};
use dcv_dataset::{wait_for_resource, DatasetReader, Resource, ResourceReadiness, WaitPolicy};
use dcv_render::PreviewRenderer;
use std::fmt;
use std::sync::Arc;

/// File name of the rendered preview inside the job directory
pub const PREVIEW_FILE_NAME: &str = "preview.jpg";

/// Why a run did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a recognized scientific-data resource
    Ineligible,
    /// A preview is already stored and no override was requested
    AlreadyPresent,
}

/// Result of one preview run
#[derive(Debug)]
pub enum PreviewOutcome {
    /// A preview was rendered and uploaded
    Created,
    /// Nothing to do
    Skipped(SkipReason),
    /// Artifact store not reachable; nothing attempted
    Unavailable,
    /// Rendering or upload failed; scratch space was released
    Failed(PreviewError),
}

impl PreviewOutcome {
    /// Whether a preview was uploaded
    #[inline]
    #[must_use]
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created)
    }

    /// Error of a failed run
    #[must_use]
    pub fn error(&self) -> Option<&PreviewError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for PreviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Skipped(SkipReason::Ineligible) => f.write_str("skipped (ineligible)"),
            Self::Skipped(SkipReason::AlreadyPresent) => f.write_str("skipped (already present)"),
            Self::Unavailable => f.write_str("store unavailable"),
            Self::Failed(e) => write!(f, "failed ({}): {e}", e.class_name()),
        }
    }
}

/// Preview generation with its collaborators
pub struct PreviewJob {
    store: Arc<dyn ArtifactStore>,
    reader: Arc<dyn DatasetReader>,
    readiness: Arc<dyn ResourceReadiness>,
    renderer: Arc<dyn PreviewRenderer>,
    scratch: Arc<ScratchSpace>,
    wait_policy: WaitPolicy,
}

impl fmt::Debug for PreviewJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewJob")
            .field("scratch", &self.scratch.path())
            .field("wait_policy", &self.wait_policy)
            .finish_non_exhaustive()
    }
}

impl PreviewJob {
    /// Create a job
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        reader: Arc<dyn DatasetReader>,
        readiness: Arc<dyn ResourceReadiness>,
        renderer: Arc<dyn PreviewRenderer>,
        scratch: Arc<ScratchSpace>,
    ) -> Self {
        Self {
            store,
            reader,
            readiness,
            renderer,
            scratch,
            wait_policy: WaitPolicy::default(),
        }
    }

    /// Set readiness wait
    #[inline]
    #[must_use]
    pub fn with_wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.wait_policy = policy;
        self
    }

    /// Artifact store used by this job
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Generate the preview of `resource`
    ///
    /// With `override_existing` a stored preview is replaced; otherwise an
    /// existing preview short-circuits the run.
    pub async fn run(&self, resource: &Resource, override_existing: bool) -> PreviewOutcome {
        if !self.store.is_available().await {
            tracing::info!(resource_id = %resource.id, "artifact store not available, not computing preview");
            return PreviewOutcome::Unavailable;
        }

        let mut resource = resource.clone();
        resource.ensure_mimetype();
        if !resource.is_dc_data() {
            tracing::debug!(
                resource_id = %resource.id,
                mimetype = ?resource.mimetype,
                "not a scientific-data resource"
            );
            return PreviewOutcome::Skipped(SkipReason::Ineligible);
        }

        match self.prepare(&resource, override_existing).await {
            Ok(Some(key)) => match self.create(&resource, &key).await {
                Ok(()) => {
                    tracing::info!(resource_id = %resource.id, name = %resource.name, "preview created");
                    PreviewOutcome::Created
                }
                Err(e) => self.failed(&resource, e),
            },
            Ok(None) => {
                tracing::debug!(resource_id = %resource.id, "preview already present");
                PreviewOutcome::Skipped(SkipReason::AlreadyPresent)
            }
            Err(e) => self.failed(&resource, e),
        }
    }

    fn failed(&self, resource: &Resource, error: PreviewError) -> PreviewOutcome {
        tracing::warn!(
            resource_id = %resource.id,
            class = error.class_name(),
            error = %error,
            "preview generation failed"
        );
        PreviewOutcome::Failed(error)
    }

    /// Wait for the upload and check for an existing preview
    ///
    /// Returns the key to write, or `None` when nothing needs doing.
    async fn prepare(
        &self,
        resource: &Resource,
        override_existing: bool,
    ) -> Result<Option<ArtifactKey>, PreviewError> {
        wait_for_resource(self.readiness.as_ref(), resource, self.wait_policy)
            .await
            .map_err(PreviewError::NotReady)?;
        let key = ArtifactKey::preview(&resource.id)?;
        if !override_existing && self.store.exists(&key).await.map_err(PreviewError::Lookup)? {
            return Ok(None);
        }
        Ok(Some(key))
    }

    async fn create(&self, resource: &Resource, key: &ArtifactKey) -> Result<(), PreviewError> {
        let workdir = self
            .scratch
            .job_dir("preview")
            .map_err(|e| PreviewError::scratch(self.scratch.path(), e))?;

        let dataset = self
            .reader
            .open(resource)
            .await
            .map_err(PreviewError::DatasetOpen)?;
        let renderer = Arc::clone(&self.renderer);
        let rendered = tokio::task::spawn_blocking(move || renderer.render(dataset.as_ref()))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    let payload = e.into_panic();
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "renderer panicked".to_string());
                    PreviewError::RenderAborted(message)
                } else {
                    PreviewError::RenderAborted("render task cancelled".to_string())
                }
            })??;

        let path = workdir.path().join(PREVIEW_FILE_NAME);
        tokio::fs::write(&path, &rendered.bytes)
            .await
            .map_err(|e| PreviewError::scratch(&path, e))?;
        self.store
            .upload_file(key, &path, true)
            .await
            .map_err(PreviewError::Upload)?;
        tracing::debug!(
            resource_id = %resource.id,
            object = %key.object_name(),
            bytes = rendered.bytes.len(),
            panels = rendered.panels.len(),
            "preview uploaded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcv_artifact::MemoryArtifactStore;
    use dcv_dataset::{AlwaysReady, Dataset, MemoryDataset, MemoryDatasetReader};
    use dcv_render::{OverviewRenderer, RenderError, RenderedPreview};

    struct PanickingRenderer;

    impl PreviewRenderer for PanickingRenderer {
        fn render(&self, _dataset: &dyn Dataset) -> Result<RenderedPreview, RenderError> {
            panic!("plotting backend crashed")
        }
    }

    fn job_with(
        store: Arc<MemoryArtifactStore>,
        renderer: Arc<dyn PreviewRenderer>,
        scratch: Arc<ScratchSpace>,
    ) -> (PreviewJob, Resource) {
        let resource = Resource::new("abcdef1234", "beads.rtdc", "pkg", 0);
        let reader = MemoryDatasetReader::new().with_dataset(
            resource.id.clone(),
            MemoryDataset::new(3)
                .with_scalar("area_um", vec![1.0, 2.0, 3.0])
                .unwrap()
                .with_scalar("deform", vec![0.1, 0.2, 0.3])
                .unwrap(),
        );
        let job = PreviewJob::new(store, Arc::new(reader), Arc::new(AlwaysReady), renderer, scratch);
        (job, resource)
    }

    #[tokio::test]
    async fn renderer_panic_becomes_failure() {
        let store = Arc::new(MemoryArtifactStore::new());
        let scratch = Arc::new(ScratchSpace::new().unwrap());
        let (job, resource) = job_with(Arc::clone(&store), Arc::new(PanickingRenderer), Arc::clone(&scratch));

        let outcome = job.run(&resource, false).await;
        let err = outcome.error().unwrap();
        assert_eq!(err.class_name(), "RenderFailure");
        assert!(err.to_string().contains("plotting backend crashed"));
        assert_eq!(store.stats().uploads, 0);
        assert_eq!(scratch.live_dirs().unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_dataset_fails_and_cleans_up() {
        let store = Arc::new(MemoryArtifactStore::new());
        let scratch = Arc::new(ScratchSpace::new().unwrap());
        let (job, _) = job_with(Arc::clone(&store), Arc::new(OverviewRenderer::new()), Arc::clone(&scratch));
        let other = Resource::new("zzzzzz9999", "other.rtdc", "pkg", 1);

        let outcome = job.run(&other, false).await;
        assert_eq!(outcome.error().unwrap().class_name(), "DatasetOpenFailure");
        assert_eq!(scratch.live_dirs().unwrap(), 0);
    }

    #[tokio::test]
    async fn created_preview_is_a_jpeg() {
        let store = Arc::new(MemoryArtifactStore::new());
        let scratch = Arc::new(ScratchSpace::new().unwrap());
        let (job, resource) = job_with(Arc::clone(&store), Arc::new(OverviewRenderer::new()), scratch);

        assert!(job.run(&resource, false).await.is_created());
        let stored = store.get(&ArtifactKey::preview(&resource.id).unwrap()).unwrap();
        assert_eq!(&stored.data[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn outcome_display() {
        assert_eq!(PreviewOutcome::Created.to_string(), "created");
        assert_eq!(
            PreviewOutcome::Skipped(SkipReason::AlreadyPresent).to_string(),
            "skipped (already present)"
        );
    }
}
