//! Domain definitions for reimbursement predictions.

use thiserror::Error;

use crate::common::error::{ArtifactLoadError, ErrorCode, PredictionError};
use crate::features::FeatureVector;

/// Where an amount came from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PredictionSource {
    Model,
    Fallback,
}

impl PredictionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionSource::Model => "model",
            PredictionSource::Fallback => "fallback",
        }
    }
}

/// Final amount with its provenance.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PredictionResult {
    pub amount: f64,
    pub source: PredictionSource,
}

/// Why the model path was abandoned.
#[derive(Debug, Error)]
pub enum FallbackReason {
    #[error(transparent)]
    Load(#[from] ArtifactLoadError),
    #[error(transparent)]
    Predict(#[from] PredictionError),
    #[error("model path panicked: {0}")]
    Fault(String),
}

impl FallbackReason {
    pub fn code(&self) -> ErrorCode {
        match self {
            FallbackReason::Load(err) => err.code(),
            FallbackReason::Predict(_) => ErrorCode::Prediction,
            FallbackReason::Fault(_) => ErrorCode::Internal,
        }
    }
}

/// Outcome of one reimbursement request. The reason for a fallback is kept as
/// data so callers and tests can inspect it.
#[derive(Debug)]
pub enum Assessment {
    Model { amount: f64 },
    Fallback { amount: f64, reason: FallbackReason },
}

impl Assessment {
    pub fn amount(&self) -> f64 {
        match self {
            Assessment::Model { amount } | Assessment::Fallback { amount, .. } => *amount,
        }
    }

    pub fn source(&self) -> PredictionSource {
        match self {
            Assessment::Model { .. } => PredictionSource::Model,
            Assessment::Fallback { .. } => PredictionSource::Fallback,
        }
    }

    pub fn reason(&self) -> Option<&FallbackReason> {
        match self {
            Assessment::Model { .. } => None,
            Assessment::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn result(&self) -> PredictionResult {
        PredictionResult {
            amount: self.amount(),
            source: self.source(),
        }
    }
}

/// Anything that can turn a feature vector into a cent-rounded amount.
pub trait Predictor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictionError>;
}

/// Supplies a predictor for each request.
pub trait ModelSource {
    type Model: Predictor;

    fn open(&self) -> Result<Self::Model, ArtifactLoadError>;
}
