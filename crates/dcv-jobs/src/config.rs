//! Job and preview settings

use crate::queue::JobQueue;
use dcv_dataset::WaitPolicy;
use dcv_render::RenderSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Queue for previews that wait on a condense job
pub const NORMAL_QUEUE: &str = "dcor-normal";
/// Queue for previews that run on their own
pub const LONG_QUEUE: &str = "dcor-long";
/// Title of preview jobs
pub const PREVIEW_JOB_TITLE: &str = "Create resource preview image";

/// Queue placement of preview jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Whether a condense stage runs before previews
    pub condense_enabled: bool,
    /// Queue used when depending on a condense job
    pub normal_queue: String,
    /// Queue used otherwise
    pub long_queue: String,
    /// Timeout with a condense dependency (seconds)
    pub condensed_timeout_secs: u64,
    /// Timeout without a condense dependency (seconds)
    pub standalone_timeout_secs: u64,
    /// Concurrent jobs per queue
    pub workers_per_queue: usize,
    /// Finished jobs remembered by the queue
    pub retained_jobs: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            condense_enabled: false,
            normal_queue: NORMAL_QUEUE.to_string(),
            long_queue: LONG_QUEUE.to_string(),
            condensed_timeout_secs: 60,
            standalone_timeout_secs: 1800,
            workers_per_queue: 2,
            retained_jobs: 1024,
        }
    }
}

impl JobsConfig {
    /// Create default config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the condense dependency
    #[inline]
    #[must_use]
    pub fn with_condense(mut self, enabled: bool) -> Self {
        self.condense_enabled = enabled;
        self
    }

    /// Set concurrent jobs per queue
    #[inline]
    #[must_use]
    pub fn with_workers_per_queue(mut self, workers: usize) -> Self {
        self.workers_per_queue = workers.max(1);
        self
    }

    /// Set how many finished jobs the queue remembers
    #[inline]
    #[must_use]
    pub fn with_retained_jobs(mut self, retained: usize) -> Self {
        self.retained_jobs = retained.max(1);
        self
    }

    /// Queue sized by this config
    #[must_use]
    pub fn job_queue(&self) -> JobQueue {
        JobQueue::with_limits(self.workers_per_queue, self.retained_jobs)
    }

    /// Set both timeouts
    #[inline]
    #[must_use]
    pub fn with_timeouts(mut self, condensed: Duration, standalone: Duration) -> Self {
        self.condensed_timeout_secs = condensed.as_secs();
        self.standalone_timeout_secs = standalone.as_secs();
        self
    }

    /// Queue name and timeout for a preview job
    #[must_use]
    pub fn preview_placement(&self) -> (&str, Duration) {
        if self.condense_enabled {
            (&self.normal_queue, Duration::from_secs(self.condensed_timeout_secs))
        } else {
            (&self.long_queue, Duration::from_secs(self.standalone_timeout_secs))
        }
    }
}

/// Preview generation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Events read per feature
    pub max_events: usize,
    /// Upper bound of the representative event index
    pub event_index_cap: usize,
    /// JPEG quality
    pub jpeg_quality: u8,
    /// Wait for uploads to complete
    pub readiness: WaitPolicy,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        let render = RenderSettings::default();
        Self {
            max_events: render.max_events,
            event_index_cap: render.event_index_cap,
            jpeg_quality: render.jpeg_quality,
            readiness: WaitPolicy::default(),
        }
    }
}

impl PreviewConfig {
    /// Set readiness wait
    #[inline]
    #[must_use]
    pub fn with_readiness(mut self, readiness: WaitPolicy) -> Self {
        self.readiness = readiness;
        self
    }

    /// Renderer settings derived from this config
    #[must_use]
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings::default()
            .with_max_events(self.max_events)
            .with_event_index_cap(self.event_index_cap)
            .with_jpeg_quality(self.jpeg_quality)
    }
}
