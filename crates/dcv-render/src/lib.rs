//! DC View Preview Rendering
//!
//! Turns an open RT-DC dataset into a single overview image.
//!
//! # Core Concepts
//!
//! - [`PreviewRenderer`]: blocking `render(dataset) -> image` contract
//! - [`OverviewRenderer`]: up to five stacked panels (scatter, density
//!   scatter, event image, mask, fluorescence trace)
//! - [`RenderSettings`]: event cap, representative index cap, geometry
//!
//! # Example
//!
//! ```rust,ignore
//! use dcv_render::{OverviewRenderer, PreviewRenderer};
//!
//! let preview = OverviewRenderer::new().render(dataset.as_ref())?;
//! std::fs::write("preview.jpg", &preview.bytes)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod canvas;
mod error;
mod panel;
mod renderer;
pub mod stats;

pub use error::RenderError;
pub use panel::{plan_panels, PanelKind, SCATTER_X, SCATTER_Y, TRACE_CHANNELS};
pub use renderer::{
    events_used, representative_index, OverviewRenderer, PreviewRenderer, RenderSettings,
    RenderedPreview, PREVIEW_MIMETYPE,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
