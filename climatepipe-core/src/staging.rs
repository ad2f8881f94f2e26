//! Staging area for downloaded archives and extracted files.
//!
//! Staging artifacts live only for the duration of one run. They are removed
//! after every table has been durably written; on failure they are
//! intentionally left in place for inspection.

use crate::error::PipelineError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Owns the scratch directory and records every artifact written into it.
#[derive(Debug)]
pub struct StagingArea {
    dir: PathBuf,
    artifacts: Vec<PathBuf>,
}

impl StagingArea {
    /// Create (if needed) and take ownership of the scratch directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            artifacts: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a path inside the staging dir and record it for cleanup.
    pub fn path_for(&mut self, file_name: &str) -> PathBuf {
        let path = self.dir.join(file_name);
        self.artifacts.push(path.clone());
        path
    }

    /// Every artifact registered so far, in write order.
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }
}

/// Delete every listed staging path. A missing path is not an error, so the
/// call is idempotent. Returns the number of files actually removed.
pub fn cleanup(paths: &[PathBuf]) -> Result<usize, PipelineError> {
    let mut removed = 0;
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(removed)
}
