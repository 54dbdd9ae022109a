//! Metric computation for trained ensembles.

use crate::common::error::PredictionError;
use crate::features::{FeatureVector, FEATURE_NAMES};
use crate::training::ensemble::Ensemble;

use super::domain::{EvalSuite, FeatureImportance, PartitionMetrics};

const CENT: f64 = 0.01;
const DOLLAR: f64 = 1.00;

/// Score raw predictions against labels. Returns `None` for an empty partition.
pub fn partition_metrics(predictions: &[f64], labels: &[f64]) -> Option<PartitionMetrics> {
    if labels.is_empty() {
        return None;
    }
    let rows = labels.len();
    let errors: Vec<f64> = predictions
        .iter()
        .zip(labels)
        .map(|(p, y)| (y - p).abs())
        .collect();
    let share = |limit: f64| errors.iter().filter(|e| **e <= limit).count() as f64 / rows as f64;

    Some(PartitionMetrics {
        rows,
        mae: errors.iter().sum::<f64>() / rows as f64,
        within_cent: share(CENT),
        within_dollar: share(DOLLAR),
    })
}

/// Gain importance keyed by feature name, highest first.
pub fn ranked_importance(ensemble: &Ensemble) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = ensemble
        .gain_importance(FEATURE_NAMES.len())
        .into_iter()
        .zip(FEATURE_NAMES)
        .map(|(score, feature)| FeatureImportance {
            feature: feature.to_string(),
            score,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.feature.cmp(&b.feature)));
    ranked
}

fn predict_all(ensemble: &Ensemble, rows: &[FeatureVector]) -> Result<Vec<f64>, PredictionError> {
    rows.iter().map(|row| ensemble.predict(row.values())).collect()
}

/// Evaluate an ensemble on its training and validation partitions.
pub fn evaluate(
    ensemble: &Ensemble,
    train: (&[FeatureVector], &[f64]),
    validation: (&[FeatureVector], &[f64]),
) -> Result<EvalSuite, PredictionError> {
    let train_predictions = predict_all(ensemble, train.0)?;
    let validation_predictions = predict_all(ensemble, validation.0)?;

    let train_metrics = partition_metrics(&train_predictions, train.1).unwrap_or(PartitionMetrics {
        rows: 0,
        mae: 0.0,
        within_cent: 0.0,
        within_dollar: 0.0,
    });

    Ok(EvalSuite {
        train: train_metrics,
        validation: partition_metrics(&validation_predictions, validation.1),
        importance: ranked_importance(ensemble),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::ensemble::{Node, Tree};

    #[test]
    fn metrics_count_tolerance_bands() {
        let metrics = partition_metrics(&[100.0, 200.5, 300.005, 410.0], &[100.0, 200.0, 300.0, 400.0])
            .unwrap();
        assert_eq!(metrics.rows, 4);
        assert!((metrics.mae - (0.0 + 0.5 + 0.005 + 10.0) / 4.0).abs() < 1e-9);
        assert_eq!(metrics.within_cent, 0.5);
        assert_eq!(metrics.within_dollar, 0.75);
    }

    #[test]
    fn empty_partition_has_no_metrics() {
        assert!(partition_metrics(&[], &[]).is_none());
    }

    #[test]
    fn importance_is_ranked_and_named() {
        let ensemble = Ensemble {
            base_score: 0.0,
            trees: vec![Tree {
                nodes: vec![
                    Node::Split {
                        feature: 2,
                        threshold: 500.0,
                        left: 1,
                        right: 2,
                        gain: 3.0,
                        cover: 2.0,
                    },
                    Node::Split {
                        feature: 0,
                        threshold: 4.5,
                        left: 3,
                        right: 4,
                        gain: 1.0,
                        cover: 1.0,
                    },
                    Node::Leaf { value: 1.0, cover: 1.0 },
                    Node::Leaf { value: 0.0, cover: 0.5 },
                    Node::Leaf { value: 0.5, cover: 0.5 },
                ],
            }],
        };

        let ranked = ranked_importance(&ensemble);
        assert_eq!(ranked.len(), FEATURE_NAMES.len());
        assert_eq!(ranked[0].feature, "total_receipts_amount");
        assert_eq!(ranked[0].score, 0.75);
        assert_eq!(ranked[1].feature, "trip_duration_days");
        assert_eq!(ranked[1].score, 0.25);
        assert!(ranked[2..].iter().all(|entry| entry.score == 0.0));
    }

    #[test]
    fn metrics_card_is_json() {
        let suite = EvalSuite {
            train: partition_metrics(&[1.0], &[1.0]).unwrap(),
            validation: None,
            importance: vec![],
        };
        let card: serde_json::Value = serde_json::from_str(&suite.metrics_card()).unwrap();
        assert_eq!(card["train"]["rows"], 1);
        assert!(card["validation"].is_null());
    }
}
