//! Training domain: boosted-tree fitting and artefact lifecycle.

pub mod booster;
pub mod domain;
pub mod ensemble;
pub mod repo_fs;
pub mod service;

pub use domain::{BoosterParams, ModelArtifact, ModelRepo, TrainingReport};
pub use ensemble::Ensemble;
pub use service::TrainingPipeline;
