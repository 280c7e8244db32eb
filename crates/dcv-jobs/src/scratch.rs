//! Scratch space for job working files
//!
//! One [`ScratchSpace`] is created at process start. Every job gets its own
//! directory inside it, removed when the returned guard drops, including on
//! error paths and when a timed-out job future is dropped. The scratch root
//! itself is removed when the space drops.

use std::io;
use std::path::Path;
use tempfile::TempDir;

/// Prefix of the process scratch directory
pub const SCRATCH_PREFIX: &str = "dcview-";

/// Process-lifetime scratch directory
#[derive(Debug)]
pub struct ScratchSpace {
    root: TempDir,
}

impl ScratchSpace {
    /// Create below the system temp directory
    ///
    /// # Errors
    /// IO failure creating the directory
    pub fn new() -> io::Result<Self> {
        let root = tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir()?;
        tracing::debug!(path = %root.path().display(), "scratch space created");
        Ok(Self { root })
    }

    /// Create below `parent`, creating it if needed
    ///
    /// # Errors
    /// IO failure creating the directories
    pub fn in_dir(parent: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let root = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(parent)?;
        tracing::debug!(path = %root.path().display(), "scratch space created");
        Ok(Self { root })
    }

    /// Scratch root
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Fresh working directory for one job
    ///
    /// # Errors
    /// IO failure creating the directory
    pub fn job_dir(&self, label: &str) -> io::Result<TempDir> {
        tempfile::Builder::new()
            .prefix(&format!("{label}-"))
            .tempdir_in(self.root.path())
    }

    /// Number of live job directories
    ///
    /// # Errors
    /// IO failure listing the root
    pub fn live_dirs(&self) -> io::Result<usize> {
        Ok(std::fs::read_dir(self.root.path())?.count())
    }
}
