//! Overview renderer
//!
//! [`OverviewRenderer`] stacks the panels a dataset can fill into a single
//! JPEG. Rendering is deterministic: only the first
//! [`RenderSettings::max_events`] events (file order) are read, so events
//! past the cap never influence the output.

use crate::canvas::{Canvas, Rect};
use crate::error::RenderError;
use crate::panel::{draw_panel, plan_panels, PanelContext, PanelKind};
use dcv_dataset::Dataset;
use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};

/// Mimetype of rendered previews
pub const PREVIEW_MIMETYPE: &str = "image/jpeg";

/// Renders a preview image from an open dataset
///
/// Implementations are blocking; callers run them off the async executor.
pub trait PreviewRenderer: Send + Sync {
    /// Render `dataset` into an encoded image
    ///
    /// # Errors
    /// Feature access or encoding failures. A dataset without displayable
    /// features is not an error.
    fn render(&self, dataset: &dyn Dataset) -> Result<RenderedPreview, RenderError>;
}

/// An encoded preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPreview {
    /// JPEG bytes
    pub bytes: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Panels drawn, top to bottom; empty for the placeholder
    pub panels: Vec<PanelKind>,
    /// Event shown in the per-event panels
    pub event_index: Option<usize>,
}

impl RenderedPreview {
    /// Whether this is the empty placeholder figure
    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.panels.is_empty()
    }
}

/// Layout and sampling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Events read per feature
    pub max_events: usize,
    /// Upper bound of the representative event index
    pub event_index_cap: usize,
    /// Figure width in pixels
    pub width: u32,
    /// Pixels per height-ratio unit
    pub unit_height: u32,
    /// Side of the square placeholder figure
    pub placeholder_size: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_events: 5000,
            event_index_cap: 47,
            width: 320,
            unit_height: 120,
            placeholder_size: 320,
            jpeg_quality: 90,
        }
    }
}

impl RenderSettings {
    /// Set event cap
    #[inline]
    #[must_use]
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    /// Set representative index cap
    #[inline]
    #[must_use]
    pub fn with_event_index_cap(mut self, cap: usize) -> Self {
        self.event_index_cap = cap;
        self
    }

    /// Set JPEG quality
    #[inline]
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }
}

/// Number of events a figure is built from
#[inline]
#[must_use]
pub fn events_used(event_count: usize, max_events: usize) -> usize {
    event_count.min(max_events)
}

/// Event shown in the image, mask and trace panels
///
/// `min(events_used - 1, cap)`, or `None` without events.
#[inline]
#[must_use]
pub fn representative_index(events_used: usize, cap: usize) -> Option<usize> {
    events_used.checked_sub(1).map(|last| last.min(cap))
}

/// Stacked-panel overview renderer
#[derive(Debug, Clone, Default)]
pub struct OverviewRenderer {
    settings: RenderSettings,
}

impl OverviewRenderer {
    /// Renderer with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer with explicit settings
    #[must_use]
    pub fn with_settings(settings: RenderSettings) -> Self {
        Self { settings }
    }

    /// Active settings
    #[must_use]
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    fn encode(&self, canvas: Canvas) -> Result<(Vec<u8>, u32, u32), RenderError> {
        let img = canvas.into_image();
        let (width, height) = img.dimensions();
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.settings.jpeg_quality).encode_image(&img)?;
        Ok((bytes, width, height))
    }

    fn placeholder(&self) -> Result<RenderedPreview, RenderError> {
        let side = self.settings.placeholder_size;
        let (bytes, width, height) = self.encode(Canvas::new(side, side))?;
        Ok(RenderedPreview {
            bytes,
            width,
            height,
            panels: Vec::new(),
            event_index: None,
        })
    }
}

impl PreviewRenderer for OverviewRenderer {
    fn render(&self, dataset: &dyn Dataset) -> Result<RenderedPreview, RenderError> {
        let used = events_used(dataset.event_count(), self.settings.max_events);
        let panels = plan_panels(dataset);
        let Some(event_index) = representative_index(used, self.settings.event_index_cap) else {
            tracing::debug!("dataset has no events, rendering placeholder");
            return self.placeholder();
        };
        if panels.is_empty() {
            tracing::debug!("no displayable features, rendering placeholder");
            return self.placeholder();
        }

        let units: u32 = panels.iter().map(|p| p.height_ratio()).sum();
        let width = self.settings.width;
        let mut canvas = Canvas::new(width, units * self.settings.unit_height);
        let ctx = PanelContext {
            dataset,
            events_used: used,
            event_index,
        };

        let mut y = 0;
        for &kind in &panels {
            let height = kind.height_ratio() * self.settings.unit_height;
            draw_panel(kind, &ctx, &mut canvas, Rect { x: 0, y, width, height })?;
            y += height;
        }

        let (bytes, width, height) = self.encode(canvas)?;
        tracing::debug!(
            panels = panels.len(),
            events_used = used,
            event_index,
            bytes = bytes.len(),
            "preview rendered"
        );
        Ok(RenderedPreview {
            bytes,
            width,
            height,
            panels,
            event_index: Some(event_index),
        })
    }
}
