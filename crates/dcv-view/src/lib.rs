//! DC View Service
//!
//! Delivery side of the preview pipeline and the `dcview` binary.
//!
//! # Core Concepts
//!
//! - [`ViewConfig`]: TOML configuration of store, queues, rendering and route
//! - [`ResourceCatalog`] / [`AccessPolicy`]: dataset lookup and read access
//! - [`PreviewRoute`]: redirect to a signed preview link, or 404
//! - [`run_batch`]: best-effort preview generation over the whole catalog
//! - [`App`]: wiring of all of the above for `dcview serve` and `dcview run-jobs`

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod app;
mod batch;
mod catalog;
mod config;
mod logging;
mod route;

pub use app::{App, AppError};
pub use batch::{run_batch, run_batch_at, BatchError, BatchFailure, BatchOptions, BatchReport};
pub use catalog::{
    AccessPolicy, CatalogError, DatasetRecord, DatasetState, MemberAccess, MemoryCatalog,
    ResourceCatalog, Viewer,
};
pub use config::{ConfigError, RouteConfig, StorageConfig, ViewConfig, DEVELOPMENT_SIGNING_SECRET};
pub use logging::{init_tracing, DEFAULT_FILTER};
pub use route::{
    can_view, object_filter, preview_filter, preview_filename, preview_url, PreviewResponse,
    PreviewRoute, NO_PREVIEW_AVAILABLE, RESOURCE_NOT_FOUND,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
