//! Inference domain: model prediction with a closed-form fallback.

pub mod domain;
pub mod fallback;
pub mod predictor;
pub mod service;

pub use domain::{Assessment, FallbackReason, PredictionResult, PredictionSource};
pub use fallback::fallback;
pub use predictor::{load, FileModel, ModelHandle};
pub use service::Reimburser;
