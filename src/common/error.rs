//! Error handling primitives shared across the core.
//!
//! Every error family maps onto a stable [`ErrorCode`] so log lines stay
//! machine parsable regardless of the message wording.

use std::path::PathBuf;

use thiserror::Error;

/// Stable error codes emitted in structured logs.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Command line input could not be coerced.
    InvalidInput = 1,
    /// Model artefact was not available.
    ModelMissing = 2,
    /// Model artefact exists but could not be decoded.
    ModelCorrupt = 3,
    /// Model artefact was trained against a different feature schema.
    SchemaMismatch = 4,
    /// Inference failed on an otherwise valid artefact.
    Prediction = 5,
    /// Training data was unusable.
    TrainingData = 6,
    /// Filesystem failure outside the artefact path.
    Io = 7,
    /// Runtime configuration was invalid.
    Config = 8,
    /// Catch-all for bugs.
    Internal = 9,
}

/// Raw command line arguments that failed coercion.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputParseError {
    #[error("expected 3 arguments, got {0}")]
    ArgumentCount(usize),
    #[error("argument `{name}` is not a valid number: {value:?}")]
    NotNumeric { name: &'static str, value: String },
}

/// Failures while reading a model artefact from disk.
#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("model artefact not found at {}", .0.display())]
    Missing(PathBuf),
    #[error("failed to read model artefact {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artefact is corrupt: {0}")]
    Corrupt(String),
    #[error("model artefact schema mismatch: {0}")]
    SchemaMismatch(String),
}

/// Faults raised while evaluating the ensemble.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictionError {
    #[error("feature vector has {got} values, model expects {expected}")]
    FeatureCount { expected: usize, got: usize },
    #[error("feature `{0}` is not finite")]
    NonFiniteFeature(&'static str),
    #[error("tree {tree} references missing node {node}")]
    BrokenTree { tree: usize, node: usize },
    #[error("model produced a non-finite value")]
    NonFiniteOutput,
}

/// Fatal problems with the labelled dataset.
#[derive(Debug, Error)]
pub enum TrainingDataError {
    #[error("failed to read training data {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("training data is not a JSON array of cases: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("training data contains no usable examples ({skipped} skipped)")]
    Empty { skipped: usize },
    #[error("{0} examples leave the training partition empty")]
    TooSmall(usize),
}

/// Invalid runtime configuration values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{key}={value} is not supported; training and inference are pinned to one thread")]
    Threads { key: &'static str, value: usize },
}

/// Canonical error type for the crate.
#[derive(Debug, Error)]
pub enum ReimburseError {
    #[error(transparent)]
    Artifact(#[from] ArtifactLoadError),
    #[error(transparent)]
    Prediction(#[from] PredictionError),
    #[error(transparent)]
    TrainingData(#[from] TrainingDataError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type ReimburseResult<T> = Result<T, ReimburseError>;

impl InputParseError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::InvalidInput
    }
}

impl ArtifactLoadError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ArtifactLoadError::Missing(_) => ErrorCode::ModelMissing,
            ArtifactLoadError::Unreadable { .. } | ArtifactLoadError::Corrupt(_) => {
                ErrorCode::ModelCorrupt
            }
            ArtifactLoadError::SchemaMismatch(_) => ErrorCode::SchemaMismatch,
        }
    }
}

impl ReimburseError {
    /// Stable code for log lines.
    pub fn code(&self) -> ErrorCode {
        match self {
            ReimburseError::Artifact(err) => err.code(),
            ReimburseError::Prediction(_) => ErrorCode::Prediction,
            ReimburseError::TrainingData(_) => ErrorCode::TrainingData,
            ReimburseError::Config(_) => ErrorCode::Config,
            ReimburseError::Io(_) => ErrorCode::Io,
            ReimburseError::Serialization(_) => ErrorCode::Internal,
        }
    }
}
