//! Domain types for model training and versioning.
//!
//! Hyperparameters are grouped the usual way for gradient boosting: tree
//! shape, regularisation and sampling.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::common::config::DEFAULT_SEED;
use crate::common::error::{ArtifactLoadError, ConfigError, ReimburseResult};
use crate::evaluation::domain::EvalSuite;
use crate::features::FEATURE_NAMES;

use super::ensemble::Ensemble;

/// Current artefact layout version.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Tree structure limits.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    /// Minimum hessian sum (row count under squared error) in each child.
    pub min_child_weight: f64,
    /// Minimum loss reduction required to keep a split.
    pub min_split_loss: f64,
}

/// L1/L2 penalties on leaf weights.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegularizationParams {
    pub alpha: f64,
    pub lambda: f64,
}

/// Row and column subsampling, driven by a fixed seed.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub seed: u64,
}

/// Full booster configuration.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoosterParams {
    pub rounds: usize,
    pub learning_rate: f64,
    pub tree: TreeParams,
    pub regularization: RegularizationParams,
    pub sampling: SamplingParams,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            rounds: 50_000,
            learning_rate: 0.03,
            tree: TreeParams {
                max_depth: 8,
                min_child_weight: 1.0,
                min_split_loss: 0.0,
            },
            regularization: RegularizationParams {
                alpha: 0.1,
                lambda: 1.0,
            },
            sampling: SamplingParams {
                subsample: 0.8,
                colsample_bytree: 0.8,
                seed: DEFAULT_SEED,
            },
        }
    }
}

impl BoosterParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sampling.seed = seed;
        self
    }

    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    /// Reject values the booster cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(key: &'static str, value: impl fmt::Display) -> ConfigError {
            ConfigError::Invalid {
                key,
                value: value.to_string(),
            }
        }

        if self.rounds == 0 {
            return Err(invalid("rounds", self.rounds));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(invalid("learning_rate", self.learning_rate));
        }
        if self.tree.max_depth == 0 {
            return Err(invalid("max_depth", self.tree.max_depth));
        }
        if !(self.tree.min_child_weight >= 0.0) {
            return Err(invalid("min_child_weight", self.tree.min_child_weight));
        }
        if !(self.tree.min_split_loss >= 0.0) {
            return Err(invalid("min_split_loss", self.tree.min_split_loss));
        }
        if !(self.regularization.alpha >= 0.0) {
            return Err(invalid("alpha", self.regularization.alpha));
        }
        if !(self.regularization.lambda >= 0.0) {
            return Err(invalid("lambda", self.regularization.lambda));
        }
        if !(self.sampling.subsample > 0.0 && self.sampling.subsample <= 1.0) {
            return Err(invalid("subsample", self.sampling.subsample));
        }
        if !(self.sampling.colsample_bytree > 0.0 && self.sampling.colsample_bytree <= 1.0) {
            return Err(invalid("colsample_bytree", self.sampling.colsample_bytree));
        }
        Ok(())
    }
}

/// Serialized model: ensemble plus the schema and lineage it was trained with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub params: BoosterParams,
    pub trained_rows: usize,
    pub dataset_fingerprint: String,
    pub ensemble: Ensemble,
}

impl ModelArtifact {
    pub fn new(
        ensemble: Ensemble,
        params: BoosterParams,
        trained_rows: usize,
        dataset_fingerprint: String,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            params,
            trained_rows,
            dataset_fingerprint,
            ensemble,
        }
    }

    /// Check the artefact against the feature schema this build computes.
    pub fn check_compatible(&self) -> Result<(), ArtifactLoadError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactLoadError::SchemaMismatch(format!(
                "format version {} (expected {ARTIFACT_FORMAT_VERSION})",
                self.format_version
            )));
        }
        let expected = FEATURE_NAMES.iter().copied();
        if self.feature_names.len() != FEATURE_NAMES.len()
            || !self.feature_names.iter().map(String::as_str).eq(expected)
        {
            return Err(ArtifactLoadError::SchemaMismatch(format!(
                "artefact features {:?} differ from {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        self.ensemble
            .validate(FEATURE_NAMES.len())
            .map_err(ArtifactLoadError::Corrupt)
    }
}

/// Repository contract for model artefacts.
pub trait ModelRepo {
    fn put_model(&self, artifact: &ModelArtifact) -> ReimburseResult<()>;
    fn get_model(&self) -> Result<ModelArtifact, ArtifactLoadError>;
}

/// Outcome of a completed training run.
#[derive(Clone, Debug)]
pub struct TrainingReport {
    pub total_rows: usize,
    pub skipped_rows: usize,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub dataset_fingerprint: String,
    pub evaluation: EvalSuite,
    pub artifact_path: PathBuf,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Loaded {} training examples ({} skipped)",
            self.total_rows, self.skipped_rows
        )?;
        writeln!(
            f,
            "Training on {} examples, validating on {} examples",
            self.train_rows, self.validation_rows
        )?;
        write!(f, "{}", self.evaluation)?;
        write!(f, "Model saved to {}", self.artifact_path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::ensemble::{Node, Tree};

    fn stump_artifact() -> ModelArtifact {
        let ensemble = Ensemble {
            base_score: 10.0,
            trees: vec![Tree {
                nodes: vec![
                    Node::Split {
                        feature: 0,
                        threshold: 3.5,
                        left: 1,
                        right: 2,
                        gain: 4.0,
                        cover: 2.0,
                    },
                    Node::Leaf { value: -1.0, cover: 1.0 },
                    Node::Leaf { value: 1.0, cover: 1.0 },
                ],
            }],
        };
        ModelArtifact::new(ensemble, BoosterParams::default(), 2, "00".into())
    }

    #[test]
    fn defaults_match_documented_hyperparameters() {
        let params = BoosterParams::default();
        assert_eq!(params.rounds, 50_000);
        assert_eq!(params.tree.max_depth, 8);
        assert_eq!(params.learning_rate, 0.03);
        assert_eq!(params.sampling.subsample, 0.8);
        assert_eq!(params.sampling.colsample_bytree, 0.8);
        assert_eq!(params.regularization.alpha, 0.1);
        assert_eq!(params.regularization.lambda, 1.0);
        assert_eq!(params.sampling.seed, 42);
        params.validate().unwrap();
    }

    #[test]
    fn invalid_params_are_rejected() {
        assert!(BoosterParams::default().with_rounds(0).validate().is_err());

        let mut params = BoosterParams::default();
        params.sampling.subsample = 0.0;
        assert!(params.validate().is_err());

        let mut params = BoosterParams::default();
        params.learning_rate = f64::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn fresh_artifact_is_compatible() {
        stump_artifact().check_compatible().unwrap();
    }

    #[test]
    fn renamed_feature_is_a_schema_mismatch() {
        let mut artifact = stump_artifact();
        artifact.feature_names[3] = "receipts_per_week".into();
        assert!(matches!(
            artifact.check_compatible(),
            Err(ArtifactLoadError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn future_format_is_a_schema_mismatch() {
        let mut artifact = stump_artifact();
        artifact.format_version = 2;
        assert!(matches!(
            artifact.check_compatible(),
            Err(ArtifactLoadError::SchemaMismatch(_))
        ));
    }
}
