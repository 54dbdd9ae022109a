//! Evaluation of trained ensembles: error metrics and feature importance.

pub mod domain;
pub mod service;

pub use domain::{EvalSuite, FeatureImportance, PartitionMetrics};
