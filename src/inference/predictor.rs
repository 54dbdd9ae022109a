//! Model-backed predictor over a loaded artefact.

use std::path::{Path, PathBuf};

use crate::common::error::{ArtifactLoadError, PredictionError};
use crate::common::money::round_cents;
use crate::features::{FeatureVector, FEATURE_NAMES};
use crate::training::domain::{ModelArtifact, ModelRepo};
use crate::training::repo_fs::FsModelRepo;

use super::domain::{ModelSource, Predictor};

/// Read-only handle over a validated artefact.
#[derive(Clone, Debug)]
pub struct ModelHandle {
    artifact: ModelArtifact,
}

impl ModelHandle {
    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }
}

/// Load and validate the artefact at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<ModelHandle, ArtifactLoadError> {
    let artifact = FsModelRepo::new(path.as_ref()).get_model()?;
    Ok(ModelHandle { artifact })
}

impl Predictor for ModelHandle {
    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        let values = features.values();
        let expected = self.artifact.feature_names.len();
        if values.len() != expected {
            return Err(PredictionError::FeatureCount {
                expected,
                got: values.len(),
            });
        }
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(PredictionError::NonFiniteFeature(FEATURE_NAMES[idx]));
        }
        let raw = self.artifact.ensemble.predict(values)?;
        Ok(round_cents(raw))
    }
}

/// Loads the artefact from disk on every request.
#[derive(Clone, Debug)]
pub struct FileModel {
    path: PathBuf,
}

impl FileModel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModelSource for FileModel {
    type Model = ModelHandle;

    fn open(&self) -> Result<ModelHandle, ArtifactLoadError> {
        load(&self.path)
    }
}
