//! Data domain: trip records and ingestion of labelled cases.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{Dataset, TrainingExample, TripRecord};
