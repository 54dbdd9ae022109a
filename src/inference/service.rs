//! Orchestration: model first, closed-form formula on any failure.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::common::config;
use crate::data::domain::TripRecord;
use crate::features::featurize;

use super::domain::{Assessment, FallbackReason, ModelSource, Predictor};
use super::fallback::fallback;
use super::predictor::FileModel;

/// Computes reimbursements for trips. Never fails.
pub struct Reimburser<S: ModelSource = FileModel> {
    source: S,
}

impl Reimburser<FileModel> {
    /// Reimburser that reloads the artefact at `path` for every request.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(FileModel::new(path))
    }

    /// Reimburser for the artefact named by the installed configuration.
    pub fn from_config() -> Self {
        Self::from_path(config::current().model_path)
    }
}

impl<S: ModelSource> Reimburser<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    fn try_model(&self, record: &TripRecord) -> Result<f64, FallbackReason> {
        let model = self.source.open()?;
        Ok(model.predict(&featurize(record))?)
    }

    /// Assess a trip, keeping track of which path produced the amount.
    pub fn assess(&self, record: &TripRecord) -> Assessment {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| self.try_model(record)))
            .unwrap_or_else(|payload| Err(FallbackReason::Fault(panic_message(payload.as_ref()))));

        match attempt {
            Ok(amount) => {
                debug!(amount, source = "model", "reimbursement computed");
                Assessment::Model { amount }
            }
            Err(reason) => {
                warn!(
                    code = reason.code() as u32,
                    error = %reason,
                    "model unavailable, using fallback formula"
                );
                Assessment::Fallback {
                    amount: fallback(record),
                    reason,
                }
            }
        }
    }

    /// Amount only.
    pub fn reimburse(&self, record: &TripRecord) -> f64 {
        self.assess(record).amount()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
