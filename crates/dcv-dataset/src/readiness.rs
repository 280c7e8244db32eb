//! Waiting for uploads to land
//!
//! A resource record can be created before its file is fully written. Jobs
//! poll a [`ResourceReadiness`] probe with a bounded wait before touching
//! the data.

use crate::error::DatasetError;
use crate::resource::{resource_path, Resource};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

/// Probe telling whether a resource's file is complete
#[async_trait]
pub trait ResourceReadiness: Send + Sync {
    /// Whether the file behind `resource` can be read now
    async fn is_ready(&self, resource: &Resource) -> bool;
}

/// Bounded polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitPolicy {
    /// Give up after this long
    #[serde(with = "millis")]
    pub timeout: Duration,
    /// Delay between probes
    #[serde(with = "millis")]
    pub poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl WaitPolicy {
    /// Set timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set poll interval
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Poll `readiness` until the resource is ready or the policy times out
///
/// # Errors
/// [`DatasetError::NotReady`] when the deadline passes first
pub async fn wait_for_resource(
    readiness: &dyn ResourceReadiness,
    resource: &Resource,
    policy: WaitPolicy,
) -> Result<(), DatasetError> {
    let start = Instant::now();
    let deadline = start + policy.timeout;
    loop {
        if readiness.is_ready(resource).await {
            tracing::debug!(
                resource_id = %resource.id,
                waited_ms = start.elapsed().as_millis(),
                "resource ready"
            );
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            let waited_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(resource_id = %resource.id, waited_ms, "resource not ready");
            return Err(DatasetError::NotReady {
                resource_id: resource.id.clone(),
                waited_ms,
            });
        }
        tokio::time::sleep(policy.poll_interval.min(deadline - now)).await;
    }
}

/// Probe that is always ready
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

#[async_trait]
impl ResourceReadiness for AlwaysReady {
    async fn is_ready(&self, _resource: &Resource) -> bool {
        true
    }
}

/// Probe checking the sharded upload below a storage root
///
/// Ready when the file exists and, if the record carries a size, the file
/// has reached it.
#[derive(Debug, Clone)]
pub struct FileReadiness {
    root: PathBuf,
}

impl FileReadiness {
    /// Probe uploads below `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ResourceReadiness for FileReadiness {
    async fn is_ready(&self, resource: &Resource) -> bool {
        let Some(path) = resource_path(&self.root, &resource.id) else {
            return false;
        };
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => resource.size.map_or(true, |size| meta.len() >= size),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ReadyAfter {
        probes: AtomicUsize,
        ready_at: usize,
    }

    #[async_trait]
    impl ResourceReadiness for ReadyAfter {
        async fn is_ready(&self, _resource: &Resource) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst) + 1 >= self.ready_at
        }
    }

    fn resource() -> Resource {
        Resource::new("abcdef123", "a.rtdc", "pkg", 0).with_size(4)
    }

    #[tokio::test(start_paused = true)]
    async fn waits_until_ready() {
        let probe = ReadyAfter {
            probes: AtomicUsize::new(0),
            ready_at: 3,
        };
        let policy = WaitPolicy::default().with_poll_interval(Duration::from_millis(10));
        wait_for_resource(&probe, &resource(), policy).await.unwrap();
        assert_eq!(probe.probes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out() {
        let probe = ReadyAfter {
            probes: AtomicUsize::new(0),
            ready_at: usize::MAX,
        };
        let policy = WaitPolicy::default()
            .with_timeout(Duration::from_millis(100))
            .with_poll_interval(Duration::from_millis(30));
        let err = wait_for_resource(&probe, &resource(), policy).await.unwrap_err();
        assert!(matches!(err, DatasetError::NotReady { .. }));
    }

    #[tokio::test]
    async fn file_readiness_checks_size() {
        let dir = tempfile::tempdir().unwrap();
        let probe = FileReadiness::new(dir.path());
        let res = resource();
        assert!(!probe.is_ready(&res).await);

        let path = resource_path(dir.path(), &res.id).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"ab").unwrap();
        assert!(!probe.is_ready(&res).await);

        std::fs::write(&path, b"abcd").unwrap();
        assert!(probe.is_ready(&res).await);
    }
}
