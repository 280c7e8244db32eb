//! Batch runner over an in-memory catalog

use chrono::{Duration, Utc};
use dcv_artifact::MemoryArtifactStore;
use dcv_dataset::{AlwaysReady, MemoryDatasetReader};
use dcv_jobs::{PreviewJob, ScratchSpace};
use dcv_render::OverviewRenderer;
use dcv_test_utils::{full_dataset, preview_key, rtdc_resource, sample_resource, test_store, text_resource};
use dcv_view::{run_batch, run_batch_at, BatchOptions, DatasetRecord, DatasetState, MemoryCatalog};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn catalog() -> MemoryCatalog {
    let now = Utc::now();
    let alpha = DatasetRecord::new("alpha", now - Duration::hours(3))
        .with_resource(sample_resource())
        .with_resource(text_resource());
    let beta = DatasetRecord::new("beta", now - Duration::days(30))
        .with_state(DatasetState::Draft)
        .with_resource(rtdc_resource("dead00beef", "broken.rtdc", 0));
    let gone = DatasetRecord::new("gamma", now)
        .with_state(DatasetState::Deleted)
        .with_resource(rtdc_resource("cafe00babe", "removed.rtdc", 0));
    MemoryCatalog::new().with_dataset(alpha).with_dataset(beta).with_dataset(gone)
}

fn job(store: Arc<MemoryArtifactStore>) -> PreviewJob {
    let reader = MemoryDatasetReader::new().with_dataset(sample_resource().id, full_dataset(30));
    PreviewJob::new(
        store,
        Arc::new(reader),
        Arc::new(AlwaysReady),
        Arc::new(OverviewRenderer::new()),
        Arc::new(ScratchSpace::new().unwrap()),
    )
}

#[tokio::test]
async fn first_run_creates_and_reports() {
    let store = test_store();
    let job = job(Arc::clone(&store));
    let mut out = Vec::<u8>::new();

    let report = run_batch(&catalog(), &job, BatchOptions::new(), &mut out).await.unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Checking dataset alpha\r\nCreated preview for calibration_beads_47.rtdc\n\
         Checking dataset beta\r\nDone!\n"
    );
    assert_eq!(report.datasets, 2);
    assert_eq!((report.created, report.skipped, report.failed), (1, 1, 1));
    assert!(!report.is_clean());
    let failure = &report.failures[0];
    assert_eq!(failure.class, "DatasetOpenFailure");
    assert_eq!(failure.resource_name, "broken.rtdc");
    assert_eq!(failure.dataset_id, "beta");
    assert!(store.get(&preview_key(&sample_resource())).is_some());
}

#[tokio::test]
async fn rerun_skips_and_force_recreates() {
    let store = test_store();
    let job = job(Arc::clone(&store));
    let catalog = catalog();

    run_batch(&catalog, &job, BatchOptions::new(), &mut Vec::<u8>::new()).await.unwrap();
    let again = run_batch(&catalog, &job, BatchOptions::new(), &mut Vec::<u8>::new()).await.unwrap();
    assert_eq!((again.created, again.skipped), (0, 2));
    assert_eq!(store.stats().uploads, 1);

    let forced = run_batch(&catalog, &job, BatchOptions::new().with_force(true), &mut Vec::<u8>::new())
        .await
        .unwrap();
    assert_eq!(forced.created, 1);
    assert_eq!(store.stats().uploads, 2);
}

#[tokio::test]
async fn age_filter_limits_datasets() {
    let store = test_store();
    let job = job(Arc::clone(&store));
    let mut out = Vec::<u8>::new();

    let options = BatchOptions::new().with_modified_days(7);
    let report = run_batch_at(&catalog(), &job, options, Utc::now(), &mut out).await.unwrap();

    assert_eq!(report.datasets, 1);
    assert!(report.is_clean());
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Checking dataset alpha"));
    assert!(!text.contains("beta"));
    assert!(text.ends_with("Done!\n"));
}

#[tokio::test]
async fn unavailable_store_attempts_nothing() {
    let store = test_store();
    store.set_available(false);
    let job = job(Arc::clone(&store));

    let report = run_batch(&catalog(), &job, BatchOptions::new(), &mut Vec::<u8>::new()).await.unwrap();
    assert_eq!(report.unavailable, 3);
    assert_eq!(report.created + report.failed, 0);
    assert_eq!(store.stats().exists_calls, 0);
}
