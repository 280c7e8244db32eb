//! Testing utilities for DC View workspace
//!
//! Shared resources, datasets and stores for tests.

#![allow(missing_docs)]

use dcv_artifact::{ArtifactKey, MemoryArtifactStore, Presigner};
use dcv_dataset::{
    ConfigValue, Frame, MemoryDataset, MemoryDatasetReader, Resource, FEATURE_IMAGE, FEATURE_MASK,
};
use std::sync::Arc;

pub const TEST_PACKAGE_ID: &str = "89bf2177-ffeb-9893-83cc-b619fc2f6663";
pub const TEST_RESOURCE_ID: &str = "fcde0f5b-3bd5-4d9a-a4b3-43f4b3c6c4e1";

pub const IMAGE_WIDTH: usize = 24;
pub const IMAGE_HEIGHT: usize = 12;
pub const TRACE_SAMPLES: usize = 16;

/// Deterministic pseudo-random sequence in `[0, 1)`
pub fn unit_noise(seed: u64, n: usize) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        })
        .collect()
}

pub fn rtdc_resource(id: &str, name: &str, position: u32) -> Resource {
    Resource::new(id, name, TEST_PACKAGE_ID, position)
}

pub fn sample_resource() -> Resource {
    rtdc_resource(TEST_RESOURCE_ID, "calibration_beads_47.rtdc", 0)
}

pub fn text_resource() -> Resource {
    rtdc_resource("0c2f4a8e-61d8-4bb5-9ad4-7f1c2a3b5d6e", "readme.txt", 1)
}

/// Dataset with only the scatter features
pub fn scatter_dataset(n: usize) -> MemoryDataset {
    let area: Vec<f64> = unit_noise(1, n).into_iter().map(|v| 20.0 + 80.0 * v).collect();
    let deform: Vec<f64> = unit_noise(2, n).into_iter().map(|v| 0.005 + 0.1 * v * v).collect();
    MemoryDataset::new(n)
        .with_scalar("area_um", area)
        .unwrap()
        .with_scalar("deform", deform)
        .unwrap()
}

/// Event `i` image: a dark ellipse whose size depends on `i`
fn event_image(i: usize) -> Frame {
    let (w, h) = (IMAGE_WIDTH, IMAGE_HEIGHT);
    let r = 2.0 + (i % 5) as f64;
    let pixels = (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .map(|(x, y)| {
            let dx = (x as f64 - w as f64 / 2.0) / r;
            let dy = (y as f64 - h as f64 / 2.0) / (r / 2.0);
            if dx * dx + dy * dy <= 1.0 { 60 } else { 180 }
        })
        .collect();
    Frame::new(w, h, pixels).unwrap()
}

fn event_mask(image: &Frame) -> Frame {
    let pixels = image.pixels.iter().map(|&v| if v < 100 { 255 } else { 0 }).collect();
    Frame::new(image.width, image.height, pixels).unwrap()
}

fn event_contour(i: usize) -> Vec<[f64; 2]> {
    let r = 2.0 + (i % 5) as f64;
    (0..16)
        .map(|k| {
            let a = k as f64 / 16.0 * std::f64::consts::TAU;
            [
                IMAGE_WIDTH as f64 / 2.0 + r * a.cos(),
                IMAGE_HEIGHT as f64 / 2.0 + r / 2.0 * a.sin(),
            ]
        })
        .collect()
}

/// Dataset with every feature the overview renderer draws
pub fn full_dataset(n: usize) -> MemoryDataset {
    let images: Vec<Frame> = (0..n).map(event_image).collect();
    let masks: Vec<Frame> = images.iter().map(event_mask).collect();
    let contours: Vec<Vec<[f64; 2]>> = (0..n).map(event_contour).collect();
    let trace = |scale: f64| -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| {
                (0..TRACE_SAMPLES)
                    .map(|s| scale * ((s as f64 - 8.0).powi(2) * -0.1).exp() * (1 + i % 3) as f64)
                    .collect()
            })
            .collect()
    };
    scatter_dataset(n)
        .with_frames(FEATURE_IMAGE, images)
        .unwrap()
        .with_frames(FEATURE_MASK, masks)
        .unwrap()
        .with_contours(contours)
        .unwrap()
        .with_trace("fl1_raw", trace(100.0))
        .unwrap()
        .with_trace("fl2_raw", trace(60.0))
        .unwrap()
        .with_config("imaging", "pixel size", ConfigValue::Float(0.34))
        .with_config("fluorescence", "samples per event", ConfigValue::Int(TRACE_SAMPLES as i64))
        .with_config("fluorescence", "sample rate", ConfigValue::Int(1_000_000))
}

pub fn reader_with(resource: &Resource, dataset: MemoryDataset) -> Arc<MemoryDatasetReader> {
    Arc::new(MemoryDatasetReader::new().with_dataset(resource.id.clone(), dataset))
}

pub fn test_store() -> Arc<MemoryArtifactStore> {
    Arc::new(MemoryArtifactStore::with_presigner(test_presigner()))
}

pub fn test_presigner() -> Presigner {
    Presigner::new("https://objects.example.org", "circle-preview", b"test signing secret")
}

pub fn preview_key(resource: &Resource) -> ArtifactKey {
    ArtifactKey::preview(&resource.id).unwrap()
}
