//! HDF5-backed RT-DC reader
//!
//! Per-event features live below the `events` group: scalar columns as 1-D
//! datasets, `image`/`mask` as `[n, height, width]`, `contour` as a group of
//! per-event `[m, 2]` datasets and `trace` as a group of `[n, samples]`
//! channels. Measurement configuration is stored as root attributes named
//! `"section:key"`.

use crate::dataset::{
    ConfigValue, Dataset, DatasetConfig, Frame, FEATURE_CONTOUR, FEATURE_TRACE,
};
use crate::error::DatasetError;
use crate::resource::{resource_path, Resource};
use async_trait::async_trait;
use hdf5::types::{TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::File;
use ndarray::s;
use std::path::{Path, PathBuf};

use crate::reader::DatasetReader;

const EVENTS: &str = "events";

/// Reader for `.rtdc` uploads below a storage root
#[derive(Debug, Clone)]
pub struct Hdf5DatasetReader {
    root: PathBuf,
}

impl Hdf5DatasetReader {
    /// Read uploads sharded below `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DatasetReader for Hdf5DatasetReader {
    async fn open(&self, resource: &Resource) -> Result<Box<dyn Dataset>, DatasetError> {
        let path = resource_path(&self.root, &resource.id)
            .ok_or_else(|| DatasetError::NotFound(resource.id.clone()))?;
        let dataset = tokio::task::spawn_blocking(move || Hdf5Dataset::open(&path))
            .await
            .map_err(|e| DatasetError::Shape(format!("reader task failed: {e}")))??;
        tracing::debug!(
            resource_id = %resource.id,
            events = dataset.event_count,
            "opened hdf5 dataset"
        );
        Ok(Box::new(dataset))
    }
}

/// An open `.rtdc` file
pub struct Hdf5Dataset {
    path: PathBuf,
    file: File,
    event_count: usize,
    config: DatasetConfig,
}

impl std::fmt::Debug for Hdf5Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hdf5Dataset")
            .field("path", &self.path)
            .field("event_count", &self.event_count)
            .finish_non_exhaustive()
    }
}

impl Hdf5Dataset {
    /// Open a file and read its configuration
    ///
    /// # Errors
    /// [`DatasetError::Unreadable`] when the file is not valid HDF5
    pub fn open(path: &Path) -> Result<Self, DatasetError> {
        if !path.is_file() {
            return Err(DatasetError::NotFound(path.display().to_string()));
        }
        let file = File::open(path).map_err(|e| DatasetError::unreadable(path, e.to_string()))?;
        let config = read_config(&file);
        let mut dataset = Self {
            path: path.to_path_buf(),
            file,
            event_count: 0,
            config,
        };
        dataset.event_count = dataset.count_events();
        Ok(dataset)
    }

    fn count_events(&self) -> usize {
        if let Some(n) = self.config.get_f64("experiment", "event count") {
            if n >= 0.0 {
                return n as usize;
            }
        }
        let Ok(events) = self.file.group(EVENTS) else {
            return 0;
        };
        events
            .member_names()
            .unwrap_or_default()
            .iter()
            .filter_map(|name| events.dataset(name).ok())
            .map(|ds| ds.shape().first().copied().unwrap_or(0))
            .max()
            .unwrap_or(0)
    }

    fn unreadable(&self, e: &hdf5::Error) -> DatasetError {
        DatasetError::unreadable(&self.path, e.to_string())
    }

    fn event_dataset(&self, name: &str) -> Result<hdf5::Dataset, DatasetError> {
        self.file
            .dataset(&format!("{EVENTS}/{name}"))
            .map_err(|_| DatasetError::MissingFeature(name.to_string()))
    }

    fn check_index(&self, feature: &str, index: usize, len: usize) -> Result<(), DatasetError> {
        if index < len {
            Ok(())
        } else {
            Err(DatasetError::IndexOutOfRange {
                feature: feature.to_string(),
                index,
                len,
            })
        }
    }
}

fn read_config(file: &File) -> DatasetConfig {
    let mut config = DatasetConfig::new();
    for name in file.attr_names().unwrap_or_default() {
        let Some((section, key)) = name.split_once(':') else {
            continue;
        };
        let Ok(attr) = file.attr(&name) else {
            continue;
        };
        let Some(value) = read_attr_value(&attr) else {
            tracing::trace!(attribute = %name, "skipping unsupported attribute type");
            continue;
        };
        config.set(section, key, value);
    }
    config
}

fn read_attr_value(attr: &hdf5::Attribute) -> Option<ConfigValue> {
    let descriptor = attr.dtype().and_then(|t| t.to_descriptor()).ok()?;
    match descriptor {
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) => {
            attr.read_scalar::<i64>().ok().map(ConfigValue::Int)
        }
        TypeDescriptor::Float(_) => attr.read_scalar::<f64>().ok().map(ConfigValue::Float),
        TypeDescriptor::Boolean => attr.read_scalar::<bool>().ok().map(ConfigValue::Bool),
        TypeDescriptor::VarLenUnicode => attr
            .read_scalar::<VarLenUnicode>()
            .ok()
            .map(|v| ConfigValue::Text(v.as_str().to_string())),
        TypeDescriptor::VarLenAscii => attr
            .read_scalar::<VarLenAscii>()
            .ok()
            .map(|v| ConfigValue::Text(v.as_str().to_string())),
        _ => None,
    }
}

impl Dataset for Hdf5Dataset {
    fn event_count(&self) -> usize {
        self.event_count
    }

    fn has_feature(&self, name: &str) -> bool {
        self.file.link_exists(&format!("{EVENTS}/{name}"))
    }

    fn scalar_prefix(&self, name: &str, limit: usize) -> Result<Vec<f64>, DatasetError> {
        let ds = self.event_dataset(name)?;
        let len = ds.shape().first().copied().unwrap_or(0);
        let n = len.min(limit);
        let values = ds
            .read_slice_1d::<f64, _>(s![..n])
            .map_err(|e| self.unreadable(&e))?;
        Ok(values.to_vec())
    }

    fn frame(&self, name: &str, index: usize) -> Result<Frame, DatasetError> {
        let ds = self.event_dataset(name)?;
        let shape = ds.shape();
        if shape.len() != 3 {
            return Err(DatasetError::Shape(format!(
                "'{name}' has {} dimensions, expected 3",
                shape.len()
            )));
        }
        self.check_index(name, index, shape[0])?;
        let plane = ds
            .read_slice_2d::<u8, _>(s![index, .., ..])
            .map_err(|e| self.unreadable(&e))?;
        let (height, width) = plane.dim();
        // masks are stored as booleans (0/1)
        let pixels = if name == crate::dataset::FEATURE_MASK {
            plane.iter().map(|&v| if v > 0 { 255 } else { 0 }).collect()
        } else {
            plane.iter().copied().collect()
        };
        Frame::new(width, height, pixels)
    }

    fn contour(&self, index: usize) -> Result<Vec<[f64; 2]>, DatasetError> {
        let group = self
            .file
            .group(&format!("{EVENTS}/{FEATURE_CONTOUR}"))
            .map_err(|_| DatasetError::MissingFeature(FEATURE_CONTOUR.to_string()))?;
        let len = group.len() as usize;
        self.check_index(FEATURE_CONTOUR, index, len)?;
        let ds = group
            .dataset(&index.to_string())
            .map_err(|e| self.unreadable(&e))?;
        let points = ds.read_2d::<f64>().map_err(|e| self.unreadable(&e))?;
        if points.ncols() != 2 {
            return Err(DatasetError::Shape(format!(
                "contour {index} has {} columns, expected 2",
                points.ncols()
            )));
        }
        Ok(points.rows().into_iter().map(|r| [r[0], r[1]]).collect())
    }

    fn trace_channels(&self) -> Vec<String> {
        self.file
            .group(&format!("{EVENTS}/{FEATURE_TRACE}"))
            .and_then(|g| g.member_names())
            .unwrap_or_default()
    }

    fn trace(&self, channel: &str, index: usize) -> Result<Vec<f64>, DatasetError> {
        let ds = self
            .file
            .dataset(&format!("{EVENTS}/{FEATURE_TRACE}/{channel}"))
            .map_err(|_| DatasetError::MissingFeature(channel.to_string()))?;
        let shape = ds.shape();
        let len = shape.first().copied().unwrap_or(0);
        self.check_index(channel, index, len)?;
        let samples = ds
            .read_slice_1d::<f64, _>(s![index, ..])
            .map_err(|e| self.unreadable(&e))?;
        Ok(samples.to_vec())
    }

    fn config(&self) -> &DatasetConfig {
        &self.config
    }
}
