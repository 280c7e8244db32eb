//! Resource-creation hook
//!
//! The host application calls [`PreviewService::on_resource_created`] once a
//! resource record exists. Eligible resources get a preview job whose id,
//! queue, timeout and dependencies follow [`JobsConfig`].

use crate::config::{JobsConfig, PREVIEW_JOB_TITLE};
use crate::error::SchedulerError;
use crate::id::{JobId, JobKind};
use crate::preview::{PreviewJob, PreviewOutcome};
use crate::queue::{EnqueueOutcome, JobQueue, JobReport, JobSpec};
use dcv_dataset::Resource;
use futures::FutureExt;
use std::sync::Arc;

impl From<PreviewOutcome> for JobReport {
    fn from(outcome: PreviewOutcome) -> Self {
        match outcome {
            PreviewOutcome::Failed(_) => Self::failed(outcome.to_string()),
            _ => Self::completed(outcome.to_string()),
        }
    }
}

/// Schedules preview jobs for new resources
#[derive(Debug, Clone)]
pub struct PreviewService {
    job: Arc<PreviewJob>,
    config: JobsConfig,
}

impl PreviewService {
    /// Create a service
    #[must_use]
    pub fn new(job: Arc<PreviewJob>, config: JobsConfig) -> Self {
        Self { job, config }
    }

    /// The preview job
    #[must_use]
    pub fn job(&self) -> &Arc<PreviewJob> {
        &self.job
    }

    /// Queue placement settings
    #[must_use]
    pub fn config(&self) -> &JobsConfig {
        &self.config
    }

    /// Descriptor of the preview job for `resource`
    #[must_use]
    pub fn preview_spec(&self, resource: &Resource, override_existing: bool) -> JobSpec {
        let (queue, timeout) = self.config.preview_placement();
        let job = Arc::clone(&self.job);
        let resource_for_run = resource.clone();
        let mut spec = JobSpec::new(
            JobId::for_resource(resource, JobKind::Preview),
            JobKind::Preview,
            move || {
                let job = Arc::clone(&job);
                let resource = resource_for_run.clone();
                async move { JobReport::from(job.run(&resource, override_existing).await) }.boxed()
            },
        )
        .with_title(PREVIEW_JOB_TITLE)
        .with_queue(queue)
        .with_timeout(timeout);
        if self.config.condense_enabled {
            spec = spec.depends_on(JobId::for_resource(resource, JobKind::Condense));
        }
        spec
    }

    /// Enqueue a preview job for a newly created resource
    ///
    /// Returns `None` for resources without a recognized scientific-data
    /// mimetype. With a condense stage configured, the resource's condense
    /// job must already be enqueued.
    ///
    /// # Errors
    /// Queue rejections, e.g. a missing condense job
    pub fn on_resource_created(
        &self,
        queue: &JobQueue,
        resource: &Resource,
    ) -> Result<Option<EnqueueOutcome>, SchedulerError> {
        let mut resource = resource.clone();
        resource.ensure_mimetype();
        if !resource.is_dc_data() {
            tracing::debug!(resource_id = %resource.id, "no preview job for non-DC resource");
            return Ok(None);
        }
        queue.enqueue(self.preview_spec(&resource, false)).map(Some)
    }
}
