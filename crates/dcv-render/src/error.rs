//! Rendering errors

use dcv_dataset::DatasetError;

/// Errors while drawing or encoding a preview
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Feature access failed
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Feature columns disagree
    #[error("inconsistent features: {0}")]
    Shape(String),

    /// JPEG encoding failed
    #[error("encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}
