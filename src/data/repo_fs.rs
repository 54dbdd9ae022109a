//! Filesystem access for labelled case files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::common::error::TrainingDataError;

/// Reads case files from the local filesystem.
pub struct FsCaseRepo {
    path: PathBuf,
}

impl FsCaseRepo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole case file.
    pub fn read_all(&self) -> Result<Vec<u8>, TrainingDataError> {
        fs::read(&self.path).map_err(|source| TrainingDataError::Unreadable {
            path: self.path.clone(),
            source,
        })
    }
}
