//! Overview panels
//!
//! Each panel draws into its own horizontal band of the figure. Panels only
//! see the capped event range prepared by the renderer.

use crate::canvas::{density_color, Axes, Canvas, Rect, BLACK, CONTOUR, FRAME};
use crate::error::RenderError;
use crate::stats::{clipped_range, kde_histogram};
use dcv_dataset::{Dataset, FEATURE_CONTOUR, FEATURE_IMAGE, FEATURE_MASK, FEATURE_TRACE};
use image::Rgb;
use serde::{Deserialize, Serialize};

/// Feature on the scatter x axis
pub const SCATTER_X: &str = "area_um";
/// Feature on the scatter y axis
pub const SCATTER_Y: &str = "deform";

/// Fluorescence channels drawn in the trace panel, with their colors
pub const TRACE_CHANNELS: [(&str, Rgb<u8>); 3] = [
    ("fl1_raw", Rgb([0x15, 0xBF, 0x00])),
    ("fl2_raw", Rgb([0xBF, 0x8A, 0x00])),
    ("fl3_raw", Rgb([0xBF, 0x0C, 0x00])),
];

/// Length of the mask scale bar in micrometers
const SCALE_BAR_UM: f64 = 10.0;

// margins (left, top, right, bottom) around each plot area
const MARGIN: (u32, u32, u32, u32) = (36, 10, 10, 18);

/// Sub-plots of the overview figure, in drawing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    /// Area vs. deformation, translucent black markers
    Scatter,
    /// Area vs. deformation colored by density
    DensityScatter,
    /// Event image with contour overlay
    Image,
    /// Event mask
    Mask,
    /// Fluorescence traces
    Trace,
}

impl PanelKind {
    /// Relative band height
    #[inline]
    #[must_use]
    pub fn height_ratio(self) -> u32 {
        match self {
            Self::Image | Self::Mask => 1,
            Self::Scatter | Self::DensityScatter | Self::Trace => 2,
        }
    }

    /// Panel title
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Scatter => "Basic scatter plot",
            Self::DensityScatter => "KDE scatter plot",
            Self::Image => "Event image with contour",
            Self::Mask => "Event mask",
            Self::Trace => "Fluorescence traces",
        }
    }
}

/// Panels the dataset can fill, in drawing order
#[must_use]
pub fn plan_panels(dataset: &dyn Dataset) -> Vec<PanelKind> {
    let mut panels = Vec::with_capacity(5);
    if dataset.has_feature(SCATTER_X) && dataset.has_feature(SCATTER_Y) {
        panels.push(PanelKind::Scatter);
        panels.push(PanelKind::DensityScatter);
    }
    if dataset.has_feature(FEATURE_IMAGE) {
        panels.push(PanelKind::Image);
    }
    if dataset.has_feature(FEATURE_MASK) {
        panels.push(PanelKind::Mask);
    }
    if dataset.has_feature(FEATURE_TRACE) {
        panels.push(PanelKind::Trace);
    }
    panels
}

/// Inputs shared by all panels of one figure
pub(crate) struct PanelContext<'a> {
    pub(crate) dataset: &'a dyn Dataset,
    pub(crate) events_used: usize,
    pub(crate) event_index: usize,
}

pub(crate) fn draw_panel(
    kind: PanelKind,
    ctx: &PanelContext<'_>,
    canvas: &mut Canvas,
    band: Rect,
) -> Result<(), RenderError> {
    let area = band.inset(MARGIN.0, MARGIN.1, MARGIN.2, MARGIN.3);
    match kind {
        PanelKind::Scatter => draw_scatter(ctx, canvas, area, false)?,
        PanelKind::DensityScatter => draw_scatter(ctx, canvas, area, true)?,
        PanelKind::Image => draw_image(ctx, canvas, area)?,
        PanelKind::Mask => draw_mask(ctx, canvas, area)?,
        PanelKind::Trace => draw_trace(ctx, canvas, area)?,
    }
    tracing::trace!(panel = kind.title(), "panel drawn");
    Ok(())
}

fn draw_scatter(
    ctx: &PanelContext<'_>,
    canvas: &mut Canvas,
    area: Rect,
    density: bool,
) -> Result<(), RenderError> {
    let x = ctx.dataset.scalar_prefix(SCATTER_X, ctx.events_used)?;
    let y = ctx.dataset.scalar_prefix(SCATTER_Y, ctx.events_used)?;
    if x.len() != y.len() {
        return Err(RenderError::Shape(format!(
            "'{SCATTER_X}' has {} values, '{SCATTER_Y}' has {}",
            x.len(),
            y.len()
        )));
    }
    let axes = Axes {
        area,
        x_range: clipped_range(&x),
        y_range: clipped_range(&y),
    };

    if density {
        let kde = kde_histogram(&x, &y);
        let max = kde.iter().copied().filter(|d| d.is_finite()).fold(0.0, f64::max);
        for ((&a, &b), &d) in x.iter().zip(&y).zip(&kde) {
            if let Some((px, py)) = axes.to_pixel(a, b) {
                let t = if max > 0.0 { d / max } else { 0.0 };
                canvas.marker(px, py, 1, density_color(t));
            }
        }
    } else {
        for (&a, &b) in x.iter().zip(&y) {
            if let Some((px, py)) = axes.to_pixel(a, b) {
                canvas.blend(px, py, BLACK, 0.2);
            }
        }
    }
    canvas.frame(area, FRAME);
    Ok(())
}

fn draw_image(ctx: &PanelContext<'_>, canvas: &mut Canvas, area: Rect) -> Result<(), RenderError> {
    let frame = ctx.dataset.frame(FEATURE_IMAGE, ctx.event_index)?;
    let target = area.fit_aspect(frame.width, frame.height);
    canvas.blit_gray(target, frame.width, frame.height, &frame.pixels);

    if ctx.dataset.has_feature(FEATURE_CONTOUR) {
        let contour = ctx.dataset.contour(ctx.event_index)?;
        let axes = Axes {
            area: target,
            x_range: (0.0, (frame.width.max(2) - 1) as f64),
            // image rows grow downward
            y_range: (-((frame.height.max(2) - 1) as f64), 0.0),
        };
        let mut points: Vec<(i64, i64)> = contour
            .iter()
            .map(|[cx, cy]| axes.to_pixel_unclipped(*cx, -cy))
            .collect();
        if let Some(&first) = points.first() {
            points.push(first);
        }
        canvas.polyline(&points, CONTOUR);
    }
    canvas.frame(target, FRAME);
    Ok(())
}

fn draw_mask(ctx: &PanelContext<'_>, canvas: &mut Canvas, area: Rect) -> Result<(), RenderError> {
    let mask = ctx.dataset.frame(FEATURE_MASK, ctx.event_index)?;
    let target = area.fit_aspect(mask.width, mask.height);
    canvas.blit_gray(target, mask.width, mask.height, &mask.pixels);
    canvas.frame(target, FRAME);

    let pixel_size = ctx
        .dataset
        .config()
        .get_f64("imaging", "pixel size")
        .filter(|p| *p > 0.0);
    match pixel_size {
        Some(um_per_px) if mask.width > 0 => {
            let screen_per_px = f64::from(target.width) / mask.width as f64;
            let bar = (SCALE_BAR_UM / um_per_px * screen_per_px).round() as i64;
            let y = i64::from(target.y + target.height) + 4;
            let x0 = i64::from(target.x);
            if bar > 0 && bar <= i64::from(target.width) {
                for dy in 0..2 {
                    canvas.line((x0, y + dy), (x0 + bar - 1, y + dy), BLACK);
                }
            }
        }
        _ => tracing::debug!("no 'imaging:pixel size', mask drawn without scale"),
    }
    Ok(())
}

fn draw_trace(ctx: &PanelContext<'_>, canvas: &mut Canvas, area: Rect) -> Result<(), RenderError> {
    let available = ctx.dataset.trace_channels();
    let mut traces = Vec::new();
    for (name, color) in TRACE_CHANNELS {
        if available.iter().any(|c| c == name) {
            traces.push((ctx.dataset.trace(name, ctx.event_index)?, color));
        }
    }

    let config = ctx.dataset.config();
    let longest = traces.iter().map(|(t, _)| t.len()).max().unwrap_or(0);
    let samples = config
        .get_f64("fluorescence", "samples per event")
        .map_or(longest, |s| s.max(0.0) as usize);
    // microseconds per sample; without a rate the axis is in samples
    let step = config
        .get_f64("fluorescence", "sample rate")
        .filter(|r| *r > 0.0)
        .map_or(1.0, |rate| 1e6 / rate);
    let t_end = (samples.max(2) - 1) as f64 * step;

    let (lo, hi) = traces
        .iter()
        .flat_map(|(t, _)| t.iter().copied())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let y_range = if hi > lo {
        (lo, hi)
    } else if lo.is_finite() {
        (lo - 0.5, lo + 0.5)
    } else {
        (0.0, 1.0)
    };
    let axes = Axes {
        area,
        x_range: (0.0, t_end),
        y_range,
    };

    for (trace, color) in &traces {
        let points: Vec<(i64, i64)> = trace
            .iter()
            .take(samples)
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, v)| axes.to_pixel_unclipped(i as f64 * step, *v))
            .collect();
        canvas.polyline(&points, *color);
    }
    canvas.frame(area, FRAME);
    Ok(())
}
