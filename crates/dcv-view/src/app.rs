//! Service wiring
//!
//! Builds the filesystem store, dataset reader, scratch space and preview
//! job from a [`ViewConfig`] and exposes the two entry points of the
//! binary: the HTTP server and the batch runner.

use crate::batch::{run_batch, BatchError, BatchOptions, BatchReport};
use crate::catalog::{CatalogError, MemberAccess, MemoryCatalog, ResourceCatalog};
use crate::config::{ConfigError, ViewConfig};
use crate::route::{object_filter, preview_filter, PreviewRoute};
use dcv_artifact::FsArtifactStore;
use dcv_dataset::{DatasetReader, FileReadiness};
use dcv_jobs::{JobQueue, PreviewJob, PreviewService, ScratchSpace};
use dcv_render::OverviewRenderer;
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use warp::filters::BoxedFilter;
use warp::reply::Response;
use warp::Filter;

/// Errors assembling or running the service
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("cannot create scratch space: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: warp::Error,
    },

    #[error(transparent)]
    Batch(#[from] BatchError),
}

#[cfg(not(feature = "hdf5"))]
mod no_hdf5 {
    use async_trait::async_trait;
    use dcv_dataset::{Dataset, DatasetError, DatasetReader, Resource};

    /// Reader used when built without HDF5 support
    pub(super) struct NoHdf5Reader;

    #[async_trait]
    impl DatasetReader for NoHdf5Reader {
        async fn open(&self, resource: &Resource) -> Result<Box<dyn Dataset>, DatasetError> {
            Err(DatasetError::unreadable(
                resource.name.as_str(),
                "dcview was built without the `hdf5` feature",
            ))
        }
    }
}

#[cfg(feature = "hdf5")]
fn dataset_reader(root: &Path) -> Arc<dyn DatasetReader> {
    Arc::new(dcv_dataset::Hdf5DatasetReader::new(root))
}

#[cfg(not(feature = "hdf5"))]
fn dataset_reader(_root: &Path) -> Arc<dyn DatasetReader> {
    tracing::warn!("built without the `hdf5` feature, previews cannot be rendered");
    Arc::new(no_hdf5::NoHdf5Reader)
}

/// Assembled service
pub struct App {
    config: ViewConfig,
    store: Arc<FsArtifactStore>,
    catalog: Arc<dyn ResourceCatalog>,
    service: PreviewService,
    queue: JobQueue,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Build from configuration, loading the catalog file if one is set
    ///
    /// # Errors
    /// Invalid configuration, unreadable catalog or scratch space failures
    pub fn build(config: ViewConfig) -> Result<Self, AppError> {
        config.validate()?;
        let catalog = match &config.catalog {
            Some(path) => MemoryCatalog::from_json_file(path)?,
            None => {
                tracing::warn!("no catalog configured, serving an empty catalog");
                MemoryCatalog::new()
            }
        };
        let reader = dataset_reader(&config.storage.root);
        Self::with_parts(config, Arc::new(catalog), reader)
    }

    /// Build with an explicit catalog and dataset reader
    ///
    /// # Errors
    /// Scratch space failures
    pub fn with_parts(
        config: ViewConfig,
        catalog: Arc<dyn ResourceCatalog>,
        reader: Arc<dyn DatasetReader>,
    ) -> Result<Self, AppError> {
        let store = Arc::new(FsArtifactStore::new(
            config.storage.root.as_path(),
            config.storage.presigner(),
        ));
        let scratch = match &config.scratch_dir {
            Some(parent) => ScratchSpace::in_dir(parent),
            None => ScratchSpace::new(),
        }
        .map_err(AppError::Scratch)?;
        let renderer = OverviewRenderer::with_settings(config.preview.render_settings());
        let job = PreviewJob::new(
            store.clone(),
            reader,
            Arc::new(FileReadiness::new(config.storage.root.as_path())),
            Arc::new(renderer),
            Arc::new(scratch),
        )
        .with_wait_policy(config.preview.readiness);
        let service = PreviewService::new(Arc::new(job), config.jobs.clone());
        let queue = config.jobs.job_queue();
        tracing::info!(
            root = %config.storage.root.display(),
            bucket = %config.storage.bucket,
            condense = config.jobs.condense_enabled,
            "service assembled"
        );
        Ok(Self {
            config,
            store,
            catalog,
            service,
            queue,
        })
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Artifact store
    #[must_use]
    pub fn store(&self) -> &Arc<FsArtifactStore> {
        &self.store
    }

    /// Preview scheduling for new resources
    #[must_use]
    pub fn service(&self) -> &PreviewService {
        &self.service
    }

    /// Job queue shared by every resource event of this service
    #[must_use]
    pub fn job_queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Preview route over this service's catalog and store
    #[must_use]
    pub fn preview_route(&self) -> PreviewRoute {
        PreviewRoute::new(
            Arc::clone(&self.catalog),
            Arc::new(MemberAccess),
            self.store.clone(),
            self.config.route.clone(),
        )
    }

    /// All HTTP routes
    #[must_use]
    pub fn routes(&self) -> BoxedFilter<(Response,)> {
        preview_filter(Arc::new(self.preview_route()))
            .or(object_filter(Arc::clone(&self.store)))
            .unify()
            .boxed()
    }

    /// Serve HTTP until `shutdown` resolves
    ///
    /// # Errors
    /// When the listen address cannot be bound
    pub async fn serve(&self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<(), AppError> {
        let addr = self.config.route.bind;
        let (bound, server) = warp::serve(self.routes().with(warp::trace::request()))
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .map_err(|source| AppError::Bind { addr, source })?;
        tracing::info!(addr = %bound, "serving previews");
        server.await;
        tracing::info!("server stopped");
        Ok(())
    }

    /// Generate previews for the whole catalog
    ///
    /// # Errors
    /// See [`run_batch`]
    pub async fn run_batch(
        &self,
        options: BatchOptions,
        out: &mut (dyn Write + Send),
    ) -> Result<BatchReport, AppError> {
        Ok(run_batch(self.catalog.as_ref(), self.service.job(), options, out).await?)
    }
}
