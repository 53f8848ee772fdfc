//! Persisted pointer to the branch of the last run that began (`.last-branch`).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::fs::write_atomic;

/// Read/write access to the run pointer.
///
/// Injected into the lifecycle manager so tests can substitute an in-memory store.
pub trait PointerStore {
    /// Return the recorded branch, or an empty string when none was recorded.
    fn read(&self) -> Result<String>;
    /// Record `branch` as the current run's branch.
    fn write(&self, branch: &str) -> Result<()>;
}

/// Pointer stored as a single line of text in the run directory.
#[derive(Debug, Clone)]
pub struct FilePointerStore {
    path: PathBuf,
}

impl FilePointerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PointerStore for FilePointerStore {
    fn read(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents.trim().to_string()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(err).with_context(|| format!("read {}", self.path.display())),
        }
    }

    fn write(&self, branch: &str) -> Result<()> {
        debug!(path = %self.path.display(), branch, "writing run pointer");
        write_atomic(&self.path, &format!("{branch}\n"))
    }
}
