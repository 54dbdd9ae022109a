//! Core record definitions and the on-disk case schema.

use serde::{Deserialize, Serialize};

/// One reimbursement request.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub duration_days: i64,
    pub miles_traveled: f64,
    pub receipts_amount: f64,
}

impl TripRecord {
    pub fn new(duration_days: i64, miles_traveled: f64, receipts_amount: f64) -> Self {
        Self {
            duration_days,
            miles_traveled,
            receipts_amount,
        }
    }
}

/// A trip with its ground-truth reimbursement.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrainingExample {
    pub record: TripRecord,
    pub expected_output: f64,
}

/// Labelled cases after ingestion, plus bookkeeping about what was dropped.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub examples: Vec<TrainingExample>,
    pub skipped: usize,
    pub fingerprint: String,
}

/// Case layout as stored in `public_cases.json`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawCase {
    pub input: RawInput,
    pub expected_output: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawInput {
    pub trip_duration_days: Option<i64>,
    // Misspelled key present in some exports.
    #[serde(rename = "trip_duraDon_days")]
    pub trip_duration_days_alias: Option<i64>,
    pub miles_traveled: f64,
    pub total_receipts_amount: f64,
}

impl RawCase {
    /// Resolve the duration key (canonical first) and build the example.
    pub fn into_example(self) -> Option<TrainingExample> {
        let duration = self
            .input
            .trip_duration_days
            .or(self.input.trip_duration_days_alias)?;
        Some(TrainingExample {
            record: TripRecord::new(
                duration,
                self.input.miles_traveled,
                self.input.total_receipts_amount,
            ),
            expected_output: self.expected_output,
        })
    }
}
