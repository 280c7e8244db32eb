//! Service configuration
//!
//! One TOML file with a section per concern; every section and field has a
//! default, so an empty file is a valid development configuration.
//!
//! ```toml
//! scratch_dir = "/var/tmp"
//!
//! [storage]
//! root = "/srv/dcview"
//! bucket = "dcview-artifacts"
//! endpoint_url = "https://dcor.example.org/objects"
//! signing_secret = "..."
//!
//! [jobs]
//! condense_enabled = true
//!
//! [preview.readiness]
//! timeout = 10000
//! poll_interval = 250
//!
//! [route]
//! bind = "0.0.0.0:8080"
//! ```

use dcv_artifact::Presigner;
use dcv_jobs::{JobsConfig, PreviewConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Secret used when none is configured; only suitable for local runs
pub const DEVELOPMENT_SIGNING_SECRET: &str = "dcview-development-secret";

/// Errors loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for [`ViewConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parse but are unusable
    #[error("invalid config value '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Artifact store and upload location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of uploads (`resources/`) and artifact buckets
    pub root: PathBuf,
    /// Bucket holding artifacts
    pub bucket: String,
    /// Public base URL of the object endpoint used in signed links
    pub endpoint_url: String,
    /// Key material for signed links
    pub signing_secret: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dcview-data"),
            bucket: "dcview-artifacts".to_string(),
            endpoint_url: "http://127.0.0.1:8080/objects".to_string(),
            signing_secret: DEVELOPMENT_SIGNING_SECRET.to_string(),
        }
    }
}

impl StorageConfig {
    /// Store rooted at `root`
    #[inline]
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Signer for links into the configured bucket
    #[must_use]
    pub fn presigner(&self) -> Presigner {
        Presigner::new(
            self.endpoint_url.as_str(),
            self.bucket.as_str(),
            self.signing_secret.as_bytes(),
        )
    }

    /// Whether the built-in development secret is in use
    #[must_use]
    pub fn uses_development_secret(&self) -> bool {
        self.signing_secret == DEVELOPMENT_SIGNING_SECRET
    }
}

/// Preview route settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Signed-link lifetime for private datasets (seconds)
    pub private_expiration_secs: u64,
    /// Signed-link lifetime for public datasets (seconds)
    pub public_expiration_secs: u64,
    /// Listen address of `dcview serve`
    pub bind: SocketAddr,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            private_expiration_secs: 3600,
            public_expiration_secs: 86400,
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

impl RouteConfig {
    /// Link lifetime for a dataset with the given visibility
    #[inline]
    #[must_use]
    pub fn expiration_secs(&self, private: bool) -> u64 {
        if private {
            self.private_expiration_secs
        } else {
            self.public_expiration_secs
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Artifact store
    pub storage: StorageConfig,
    /// Queue placement
    pub jobs: JobsConfig,
    /// Rendering and readiness
    pub preview: PreviewConfig,
    /// HTTP surface
    pub route: RouteConfig,
    /// Parent of the process scratch directory (system temp dir if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
    /// Dataset catalog file (JSON)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
}

impl ViewConfig {
    /// Load and validate a TOML file
    ///
    /// # Errors
    /// IO, parse or validation failures
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Parse or validation failures
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Use `root` for uploads and artifacts
    #[inline]
    #[must_use]
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage.root = root.into();
        self
    }

    /// Use `catalog` as the dataset catalog
    #[inline]
    #[must_use]
    pub fn with_catalog(mut self, catalog: impl Into<PathBuf>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Check values that deserialize but cannot work
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.bucket.is_empty() || self.storage.bucket.contains('/') {
            return Err(ConfigError::invalid(
                "storage.bucket",
                "must be a non-empty name without '/'",
            ));
        }
        if self.storage.signing_secret.is_empty() {
            return Err(ConfigError::invalid("storage.signing_secret", "must not be empty"));
        }
        if !(self.storage.endpoint_url.starts_with("http://")
            || self.storage.endpoint_url.starts_with("https://"))
        {
            return Err(ConfigError::invalid(
                "storage.endpoint_url",
                format!("'{}' is not an http(s) URL", self.storage.endpoint_url),
            ));
        }
        if self.jobs.workers_per_queue == 0 {
            return Err(ConfigError::invalid("jobs.workers_per_queue", "must be at least 1"));
        }
        if self.jobs.retained_jobs == 0 {
            return Err(ConfigError::invalid("jobs.retained_jobs", "must be at least 1"));
        }
        if self.jobs.normal_queue.is_empty() || self.jobs.long_queue.is_empty() {
            return Err(ConfigError::invalid("jobs", "queue names must not be empty"));
        }
        if self.preview.max_events == 0 {
            return Err(ConfigError::invalid("preview.max_events", "must be at least 1"));
        }
        if !(1..=100).contains(&self.preview.jpeg_quality) {
            return Err(ConfigError::invalid("preview.jpeg_quality", "must be within 1..=100"));
        }
        if self.preview.readiness.poll_interval.is_zero() {
            return Err(ConfigError::invalid(
                "preview.readiness.poll_interval",
                "must be positive",
            ));
        }
        Ok(())
    }
}
