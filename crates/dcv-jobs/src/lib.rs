//! DC View Jobs
//!
//! Background preview generation for RT-DC resources.
//!
//! # Core Concepts
//!
//! - [`JobQueue`]: jobs keyed by deterministic [`JobId`]s, duplicate
//!   collapsing, dependency ordering, per-queue worker limits and timeouts
//! - [`PreviewJob`]: idempotent render-and-upload of one resource's preview
//! - [`PreviewService`]: the resource-creation hook that enqueues previews
//! - [`ScratchSpace`]: process-lifetime scratch root with per-job directories
//!
//! # Example
//!
//! ```rust,ignore
//! use dcv_jobs::{JobQueue, JobsConfig, PreviewJob, PreviewService};
//!
//! let service = PreviewService::new(Arc::new(preview_job), JobsConfig::default());
//! let queue = JobQueue::new(2);
//! service.on_resource_created(&queue, &resource)?;
//! queue.wait_idle().await;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod error;
mod hook;
mod id;
mod preview;
mod queue;
mod scratch;

pub use config::{JobsConfig, PreviewConfig, LONG_QUEUE, NORMAL_QUEUE, PREVIEW_JOB_TITLE};
pub use error::{PreviewError, SchedulerError};
pub use hook::PreviewService;
pub use id::{JobId, JobKind};
pub use preview::{PreviewJob, PreviewOutcome, SkipReason, PREVIEW_FILE_NAME};
pub use queue::{EnqueueOutcome, JobFuture, JobQueue, JobRecord, JobReport, JobSpec, JobStatus};
pub use scratch::{ScratchSpace, SCRATCH_PREFIX};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
