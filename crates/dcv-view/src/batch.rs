//! Batch preview generation
//!
//! Walks every dataset in the catalog (drafts included, deleted ones
//! skipped) and runs the preview job for each resource. Failures are
//! logged and counted; the run continues.

use crate::catalog::{CatalogError, DatasetRecord, DatasetState, ResourceCatalog};
use chrono::{DateTime, Duration, Utc};
use dcv_jobs::{PreviewJob, PreviewOutcome};
use serde::Serialize;
use std::io::Write;

/// Errors that stop a batch run
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Datasets could not be listed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Progress output could not be written
    #[error("cannot write progress: {0}")]
    Output(#[from] std::io::Error),
}

/// Which resources to process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Replace existing previews
    pub force: bool,
    /// Only datasets modified within this many days; negative means all
    pub modified_days: i64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            force: false,
            modified_days: -1,
        }
    }
}

impl BatchOptions {
    /// All datasets, keep existing previews
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace existing previews
    #[inline]
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Restrict to recently modified datasets
    #[inline]
    #[must_use]
    pub fn with_modified_days(mut self, days: i64) -> Self {
        self.modified_days = days;
        self
    }

    /// Whether a dataset passes the age filter at `now`
    #[must_use]
    pub fn includes(&self, dataset: &DatasetRecord, now: DateTime<Utc>) -> bool {
        if dataset.state == DatasetState::Deleted {
            return false;
        }
        if self.modified_days < 0 {
            return true;
        }
        let horizon = Duration::try_days(self.modified_days)
            .and_then(|d| now.checked_sub_signed(d))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        dataset.metadata_modified >= horizon
    }
}

/// One failed resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub dataset_id: String,
    pub resource_id: String,
    pub resource_name: String,
    pub class: &'static str,
    pub message: String,
}

/// Counts of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub datasets: usize,
    pub created: usize,
    pub skipped: usize,
    pub unavailable: usize,
    pub failed: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    /// Whether no resource failed
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Run the preview job over the catalog
///
/// # Errors
/// Catalog listing or progress output failures; per-resource failures are
/// only counted
pub async fn run_batch(
    catalog: &dyn ResourceCatalog,
    job: &PreviewJob,
    options: BatchOptions,
    out: &mut (dyn Write + Send),
) -> Result<BatchReport, BatchError> {
    run_batch_at(catalog, job, options, Utc::now(), out).await
}

/// [`run_batch`] with an explicit reference time for the age filter
///
/// # Errors
/// See [`run_batch`]
pub async fn run_batch_at(
    catalog: &dyn ResourceCatalog,
    job: &PreviewJob,
    options: BatchOptions,
    now: DateTime<Utc>,
    out: &mut (dyn Write + Send),
) -> Result<BatchReport, BatchError> {
    let mut report = BatchReport::default();
    let mut line_open = false;

    for dataset in catalog.datasets().await? {
        if !options.includes(&dataset, now) {
            continue;
        }
        report.datasets += 1;
        write!(out, "Checking dataset {}\r", dataset.id)?;
        out.flush()?;
        line_open = true;

        for resource in &dataset.resources {
            match job.run(resource, options.force).await {
                PreviewOutcome::Created => {
                    report.created += 1;
                    writeln!(out)?;
                    writeln!(out, "Created preview for {}", resource.name)?;
                    line_open = false;
                }
                PreviewOutcome::Skipped(_) => report.skipped += 1,
                PreviewOutcome::Unavailable => report.unavailable += 1,
                PreviewOutcome::Failed(e) => {
                    tracing::error!(
                        class = e.class_name(),
                        message = %e,
                        resource = %resource.name,
                        resource_id = %resource.id,
                        dataset_id = %dataset.id,
                        "preview failed"
                    );
                    report.failed += 1;
                    report.failures.push(BatchFailure {
                        dataset_id: dataset.id.clone(),
                        resource_id: resource.id.clone(),
                        resource_name: resource.name.clone(),
                        class: e.class_name(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    if line_open {
        writeln!(out)?;
    }
    writeln!(out, "Done!")?;
    tracing::info!(
        datasets = report.datasets,
        created = report.created,
        skipped = report.skipped,
        unavailable = report.unavailable,
        failed = report.failed,
        "batch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dataset(modified: DateTime<Utc>) -> DatasetRecord {
        DatasetRecord::new("ds", modified)
    }

    #[test]
    fn age_filter() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();
        let recent = dataset(now - Duration::days(2));
        let old = dataset(now - Duration::days(30));

        let all = BatchOptions::new();
        assert!(all.includes(&old, now));

        let week = BatchOptions::new().with_modified_days(7);
        assert!(week.includes(&recent, now));
        assert!(!week.includes(&old, now));

        let today = BatchOptions::new().with_modified_days(0);
        assert!(!today.includes(&recent, now));
        assert!(today.includes(&dataset(now), now));

        assert!(!all.includes(&recent.with_state(DatasetState::Deleted), now));
        assert!(all.includes(&old.with_state(DatasetState::Draft), now));
    }

    #[test]
    fn huge_horizon_includes_everything() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();
        let ancient = dataset(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap());
        assert!(BatchOptions::new().with_modified_days(i64::MAX).includes(&ancient, now));
    }
}
