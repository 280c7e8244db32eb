//! DC View Dataset Access
//!
//! Resource records, the scientific-data mimetype table and read access to
//! RT-DC measurements.
//!
//! # Core Concepts
//!
//! - [`Resource`]: an uploaded file and its owning dataset
//! - [`Dataset`]: per-event features, frames, traces and configuration
//! - [`DatasetReader`]: opens the dataset behind a resource
//! - [`ResourceReadiness`] / [`wait_for_resource`]: bounded wait for uploads

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod dataset;
mod error;
#[cfg(feature = "hdf5")]
mod hdf5_reader;
mod mimetype;
mod reader;
mod readiness;
mod resource;

pub use dataset::{
    ConfigValue, Dataset, DatasetConfig, Frame, MemoryDataset, FEATURE_CONTOUR, FEATURE_IMAGE,
    FEATURE_MASK, FEATURE_TRACE,
};
pub use error::DatasetError;
#[cfg(feature = "hdf5")]
pub use hdf5_reader::{Hdf5Dataset, Hdf5DatasetReader};
pub use mimetype::{is_dc_mimetype, mimetype_for_name, DC_MIME_TYPES, RTDC_MIMETYPE};
pub use reader::{DatasetReader, MemoryDatasetReader};
pub use readiness::{wait_for_resource, AlwaysReady, FileReadiness, ResourceReadiness, WaitPolicy};
pub use resource::{resource_path, Resource};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
