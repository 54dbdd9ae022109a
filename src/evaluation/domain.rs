//! Domain primitives for model evaluation.

use std::fmt;

use serde::Serialize;

/// Share of the model's split gain attributed to one feature.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub score: f64,
}

/// Accuracy of predictions against ground truth on one partition.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct PartitionMetrics {
    pub rows: usize,
    pub mae: f64,
    /// Fraction of rows within $0.01 of the label.
    pub within_cent: f64,
    /// Fraction of rows within $1.00 of the label.
    pub within_dollar: f64,
}

/// Summary of evaluation metrics for a trained ensemble.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvalSuite {
    pub train: PartitionMetrics,
    /// `None` when the validation partition is empty.
    pub validation: Option<PartitionMetrics>,
    /// Sorted by descending score.
    pub importance: Vec<FeatureImportance>,
}

impl EvalSuite {
    /// Metrics card as a single JSON document.
    pub fn metrics_card(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl fmt::Display for EvalSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Training Mean Absolute Error: ${:.2}", self.train.mae)?;
        match &self.validation {
            Some(val) => {
                writeln!(f, "Validation Mean Absolute Error: ${:.2}", val.mae)?;
                writeln!(
                    f,
                    "Exact matches (±$0.01): {} ({:.2}%)",
                    (val.within_cent * val.rows as f64).round(),
                    val.within_cent * 100.0
                )?;
                writeln!(
                    f,
                    "Close matches (±$1.00): {} ({:.2}%)",
                    (val.within_dollar * val.rows as f64).round(),
                    val.within_dollar * 100.0
                )?;
            }
            None => writeln!(f, "Validation partition is empty")?,
        }
        writeln!(f, "Feature Importance:")?;
        for entry in &self.importance {
            writeln!(f, "{}: {:.4}", entry.feature, entry.score)?;
        }
        Ok(())
    }
}
