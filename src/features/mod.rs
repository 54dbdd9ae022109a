//! Feature engineering shared verbatim by training and inference.
//!
//! Both paths call [`featurize`]; there is no second implementation to drift.

use crate::data::domain::TripRecord;

/// Number of values in a feature vector.
pub const FEATURE_COUNT: usize = 18;

/// Ordered feature schema. Artefacts record this list and are rejected on load
/// if it differs.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "trip_duration_days",
    "miles_traveled",
    "total_receipts_amount",
    "receipts_per_day",
    "miles_per_day",
    "receipts_per_mile",
    "short_trip",
    "medium_trip",
    "long_trip",
    "low_receipts",
    "medium_receipts",
    "high_receipts",
    "low_miles",
    "medium_miles",
    "high_miles",
    "trip_miles_interaction",
    "trip_receipts_interaction",
    "miles_receipts_interaction",
];

/// Raw trip attributes followed by the derived signals, in schema order.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Value of a named feature, if the name is part of the schema.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|candidate| *candidate == name)
            .map(|idx| self.0[idx])
    }
}

impl AsRef<[f64]> for FeatureVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Derive the full feature vector for a trip.
pub fn featurize(record: &TripRecord) -> FeatureVector {
    let days = record.duration_days as f64;
    let miles = record.miles_traveled;
    let receipts = record.receipts_amount;
    let day_divisor = days.max(1.0);

    FeatureVector([
        days,
        miles,
        receipts,
        receipts / day_divisor,
        miles / day_divisor,
        receipts / miles.max(1.0),
        flag(record.duration_days <= 3),
        flag(record.duration_days > 3 && record.duration_days <= 7),
        flag(record.duration_days > 7),
        flag(receipts <= 500.0),
        flag(receipts > 500.0 && receipts <= 1500.0),
        flag(receipts > 1500.0),
        flag(miles <= 300.0),
        flag(miles > 300.0 && miles <= 800.0),
        flag(miles > 800.0),
        days * miles,
        days * receipts,
        miles * receipts,
    ])
}
