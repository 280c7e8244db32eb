//! Dataset handles
//!
//! A [`Dataset`] exposes the per-event features of one measurement. Handles
//! are owned by the job that opened them and release their backing file on
//! drop.

use crate::error::DatasetError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Feature name of event images
pub const FEATURE_IMAGE: &str = "image";
/// Feature name of event masks
pub const FEATURE_MASK: &str = "mask";
/// Feature name of event contours
pub const FEATURE_CONTOUR: &str = "contour";
/// Feature name of fluorescence traces
pub const FEATURE_TRACE: &str = "trace";

/// A 2-D grayscale frame (image or mask), row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Columns
    pub width: usize,
    /// Rows
    pub height: usize,
    /// `width * height` intensities; masks use 0 and 255
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Create a frame, checking the pixel count
    ///
    /// # Errors
    /// [`DatasetError::Shape`] when `pixels.len() != width * height`
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, DatasetError> {
        if pixels.len() != width * height {
            return Err(DatasetError::Shape(format!(
                "frame {width}x{height} needs {} pixels, got {}",
                width * height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Intensity at column `x`, row `y`
    #[inline]
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }
}

/// A configuration value of a measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Text
    Text(String),
}

impl ConfigValue {
    /// Numeric view of the value
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }
}

/// Sectioned measurement configuration (`section -> key -> value`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    sections: BTreeMap<String, BTreeMap<String, ConfigValue>>,
}

impl DatasetConfig {
    /// Empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one value
    pub fn set(&mut self, section: &str, key: &str, value: ConfigValue) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Look up one value
    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&ConfigValue> {
        self.sections.get(section).and_then(|s| s.get(key))
    }

    /// Look up a numeric value
    #[must_use]
    pub fn get_f64(&self, section: &str, key: &str) -> Option<f64> {
        self.get(section, key).and_then(ConfigValue::as_f64)
    }

    /// Section names
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

/// Read access to one measurement
///
/// Scalar features are read as a prefix so callers can cap the number of
/// events they touch regardless of file size.
pub trait Dataset: Send {
    /// Number of events
    fn event_count(&self) -> usize;

    /// Whether a feature (scalar or non-scalar) is present
    fn has_feature(&self, name: &str) -> bool;

    /// First `limit` values of a scalar feature
    ///
    /// # Errors
    /// [`DatasetError::MissingFeature`] when absent
    fn scalar_prefix(&self, name: &str, limit: usize) -> Result<Vec<f64>, DatasetError>;

    /// Image or mask frame of one event
    ///
    /// # Errors
    /// Missing feature or index out of range
    fn frame(&self, name: &str, index: usize) -> Result<Frame, DatasetError>;

    /// Contour of one event as `(x, y)` pixel coordinates
    ///
    /// # Errors
    /// Missing feature or index out of range
    fn contour(&self, index: usize) -> Result<Vec<[f64; 2]>, DatasetError>;

    /// Names of the available fluorescence trace channels
    fn trace_channels(&self) -> Vec<String>;

    /// One trace channel of one event
    ///
    /// # Errors
    /// Missing channel or index out of range
    fn trace(&self, channel: &str, index: usize) -> Result<Vec<f64>, DatasetError>;

    /// Measurement configuration
    fn config(&self) -> &DatasetConfig;
}

/// Fully in-memory dataset
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    event_count: usize,
    scalars: BTreeMap<String, Vec<f64>>,
    frames: BTreeMap<String, Vec<Frame>>,
    contours: Option<Vec<Vec<[f64; 2]>>>,
    traces: BTreeMap<String, Vec<Vec<f64>>>,
    config: DatasetConfig,
}

impl MemoryDataset {
    /// Dataset with `event_count` events and no features
    #[must_use]
    pub fn new(event_count: usize) -> Self {
        Self {
            event_count,
            ..Self::default()
        }
    }

    fn check_len(&self, what: &str, len: usize) -> Result<(), DatasetError> {
        if len == self.event_count {
            Ok(())
        } else {
            Err(DatasetError::Shape(format!(
                "'{what}' has {len} events, dataset has {}",
                self.event_count
            )))
        }
    }

    /// Add a scalar feature
    ///
    /// # Errors
    /// [`DatasetError::Shape`] on length mismatch
    pub fn with_scalar(mut self, name: &str, values: Vec<f64>) -> Result<Self, DatasetError> {
        self.check_len(name, values.len())?;
        self.scalars.insert(name.to_string(), values);
        Ok(self)
    }

    /// Add image or mask frames
    ///
    /// # Errors
    /// [`DatasetError::Shape`] on length mismatch
    pub fn with_frames(mut self, name: &str, frames: Vec<Frame>) -> Result<Self, DatasetError> {
        self.check_len(name, frames.len())?;
        self.frames.insert(name.to_string(), frames);
        Ok(self)
    }

    /// Add contours
    ///
    /// # Errors
    /// [`DatasetError::Shape`] on length mismatch
    pub fn with_contours(mut self, contours: Vec<Vec<[f64; 2]>>) -> Result<Self, DatasetError> {
        self.check_len(FEATURE_CONTOUR, contours.len())?;
        self.contours = Some(contours);
        Ok(self)
    }

    /// Add one fluorescence trace channel
    ///
    /// # Errors
    /// [`DatasetError::Shape`] on length mismatch
    pub fn with_trace(mut self, channel: &str, traces: Vec<Vec<f64>>) -> Result<Self, DatasetError> {
        self.check_len(channel, traces.len())?;
        self.traces.insert(channel.to_string(), traces);
        Ok(self)
    }

    /// Set one configuration value
    #[must_use]
    pub fn with_config(mut self, section: &str, key: &str, value: ConfigValue) -> Self {
        self.config.set(section, key, value);
        self
    }

    /// Replace one scalar value in place
    ///
    /// # Errors
    /// Missing feature or index out of range
    pub fn set_scalar(&mut self, name: &str, index: usize, value: f64) -> Result<(), DatasetError> {
        let column = self
            .scalars
            .get_mut(name)
            .ok_or_else(|| DatasetError::MissingFeature(name.to_string()))?;
        let len = column.len();
        let slot = column.get_mut(index).ok_or(DatasetError::IndexOutOfRange {
            feature: name.to_string(),
            index,
            len,
        })?;
        *slot = value;
        Ok(())
    }

    fn out_of_range(&self, feature: &str, index: usize) -> DatasetError {
        DatasetError::IndexOutOfRange {
            feature: feature.to_string(),
            index,
            len: self.event_count,
        }
    }
}

impl Dataset for MemoryDataset {
    fn event_count(&self) -> usize {
        self.event_count
    }

    fn has_feature(&self, name: &str) -> bool {
        match name {
            FEATURE_CONTOUR => self.contours.is_some(),
            FEATURE_TRACE => !self.traces.is_empty(),
            other => self.scalars.contains_key(other) || self.frames.contains_key(other),
        }
    }

    fn scalar_prefix(&self, name: &str, limit: usize) -> Result<Vec<f64>, DatasetError> {
        let column = self
            .scalars
            .get(name)
            .ok_or_else(|| DatasetError::MissingFeature(name.to_string()))?;
        Ok(column.iter().take(limit).copied().collect())
    }

    fn frame(&self, name: &str, index: usize) -> Result<Frame, DatasetError> {
        let frames = self
            .frames
            .get(name)
            .ok_or_else(|| DatasetError::MissingFeature(name.to_string()))?;
        frames
            .get(index)
            .cloned()
            .ok_or_else(|| self.out_of_range(name, index))
    }

    fn contour(&self, index: usize) -> Result<Vec<[f64; 2]>, DatasetError> {
        let contours = self
            .contours
            .as_ref()
            .ok_or_else(|| DatasetError::MissingFeature(FEATURE_CONTOUR.to_string()))?;
        contours
            .get(index)
            .cloned()
            .ok_or_else(|| self.out_of_range(FEATURE_CONTOUR, index))
    }

    fn trace_channels(&self) -> Vec<String> {
        self.traces.keys().cloned().collect()
    }

    fn trace(&self, channel: &str, index: usize) -> Result<Vec<f64>, DatasetError> {
        let traces = self
            .traces
            .get(channel)
            .ok_or_else(|| DatasetError::MissingFeature(channel.to_string()))?;
        traces
            .get(index)
            .cloned()
            .ok_or_else(|| self.out_of_range(channel, index))
    }

    fn config(&self) -> &DatasetConfig {
        &self.config
    }
}
