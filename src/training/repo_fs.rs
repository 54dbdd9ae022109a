//! Filesystem repository for trained model artefacts.
//!
//! Writes go to a sibling temp file first and are renamed into place, so a
//! reader never observes a half-written artefact.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::common::error::{ArtifactLoadError, ReimburseResult};

use super::domain::{ModelArtifact, ModelRepo};

/// Persist a single artefact at a fixed path.
pub struct FsModelRepo {
    path: PathBuf,
}

impl FsModelRepo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
            _ => Ok(()),
        }
    }
}

impl ModelRepo for FsModelRepo {
    fn put_model(&self, artifact: &ModelArtifact) -> ReimburseResult<()> {
        self.ensure_dirs()?;
        let staging = self.staging_path();
        {
            let mut writer = BufWriter::new(File::create(&staging)?);
            serde_json::to_writer(&mut writer, artifact)?;
            writer.flush()?;
        }
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn get_model(&self) -> Result<ModelArtifact, ArtifactLoadError> {
        let bytes = fs::read(&self.path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ArtifactLoadError::Missing(self.path.clone()),
            _ => ArtifactLoadError::Unreadable {
                path: self.path.clone(),
                source,
            },
        })?;
        let artifact: ModelArtifact = serde_json::from_slice(&bytes)
            .map_err(|err| ArtifactLoadError::Corrupt(err.to_string()))?;
        artifact.check_compatible()?;
        Ok(artifact)
    }
}
