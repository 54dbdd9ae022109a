//! Offline training pipeline: load, featurize, split, fit, evaluate, persist.
//!
//! Any failure before `Persist` aborts the run without touching the artefact
//! path.

use std::time::Instant;

use tracing::info;

use crate::common::error::{ReimburseResult, TrainingDataError};
use crate::data::domain::{TrainingExample, TripRecord};
use crate::data::repo_fs::FsCaseRepo;
use crate::data::service as data_service;
use crate::evaluation::service as evaluation_service;
use crate::features::{featurize, FeatureVector};

use super::booster::{self, FeatureMatrix};
use super::domain::{BoosterParams, ModelArtifact, ModelRepo, TrainingReport};
use super::repo_fs::FsModelRepo;

/// Share of sorted examples used for fitting; the tail is held out.
pub const TRAIN_FRACTION: f64 = 0.8;

/// Pipeline stages, in execution order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Stage {
    LoadData,
    Featurize,
    Split,
    Fit,
    Evaluate,
    Persist,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::LoadData => "load_data",
            Stage::Featurize => "featurize",
            Stage::Split => "split",
            Stage::Fit => "fit",
            Stage::Evaluate => "evaluate",
            Stage::Persist => "persist",
        }
    }
}

fn timed<T>(stage: Stage, work: impl FnOnce() -> ReimburseResult<T>) -> ReimburseResult<T> {
    let start = Instant::now();
    let out = work()?;
    info!(
        stage = stage.as_str(),
        dur_ms = start.elapsed().as_millis() as u64,
        "stage complete"
    );
    Ok(out)
}

/// Sort by `(duration, miles, receipts)` and cut at `floor(0.8 * n)`.
pub fn split_partitions<T, F>(
    mut rows: Vec<T>,
    record_of: F,
) -> Result<(Vec<T>, Vec<T>), TrainingDataError>
where
    F: Fn(&T) -> &TripRecord,
{
    rows.sort_by(|a, b| {
        let (a, b) = (record_of(a), record_of(b));
        a.duration_days
            .cmp(&b.duration_days)
            .then_with(|| a.miles_traveled.total_cmp(&b.miles_traveled))
            .then_with(|| a.receipts_amount.total_cmp(&b.receipts_amount))
    });
    let cut = (TRAIN_FRACTION * rows.len() as f64) as usize;
    if cut == 0 {
        return Err(TrainingDataError::TooSmall(rows.len()));
    }
    let validation = rows.split_off(cut);
    Ok((rows, validation))
}

/// An example paired with its derived features.
#[derive(Copy, Clone, Debug)]
struct Featurized {
    example: TrainingExample,
    features: FeatureVector,
}

fn columns(rows: &[Featurized]) -> (Vec<FeatureVector>, Vec<f64>) {
    rows.iter()
        .map(|row| (row.features, row.example.expected_output))
        .unzip()
}

/// Training run wired to a case file and an artefact repository.
pub struct TrainingPipeline {
    cases: FsCaseRepo,
    models: FsModelRepo,
    params: BoosterParams,
}

impl TrainingPipeline {
    pub fn new(cases: FsCaseRepo, models: FsModelRepo, params: BoosterParams) -> Self {
        Self {
            cases,
            models,
            params,
        }
    }

    /// Execute every stage and return the report. Nothing is written unless
    /// all earlier stages succeed.
    pub fn run(&self) -> ReimburseResult<TrainingReport> {
        self.params.validate()?;

        let dataset = timed(Stage::LoadData, || Ok(data_service::ingest(&self.cases)?))?;
        let total_rows = dataset.examples.len();
        info!(
            rows = total_rows,
            skipped = dataset.skipped,
            "loaded training examples"
        );

        let featurized: Vec<Featurized> = timed(Stage::Featurize, || {
            Ok(dataset
                .examples
                .iter()
                .map(|example| Featurized {
                    example: *example,
                    features: featurize(&example.record),
                })
                .collect())
        })?;

        let (train, validation) = timed(Stage::Split, || {
            Ok(split_partitions(featurized, |row| &row.example.record)?)
        })?;
        info!(
            train = train.len(),
            validation = validation.len(),
            "partitioned examples"
        );

        let (train_x, train_y) = columns(&train);
        let (val_x, val_y) = columns(&validation);

        let ensemble = timed(Stage::Fit, || {
            booster::fit(&FeatureMatrix::from_rows(&train_x), &train_y, &self.params)
        })?;

        let evaluation = timed(Stage::Evaluate, || {
            Ok(evaluation_service::evaluate(
                &ensemble,
                (train_x.as_slice(), train_y.as_slice()),
                (val_x.as_slice(), val_y.as_slice()),
            )?)
        })?;
        info!(card = %evaluation.metrics_card(), "evaluation complete");

        let artifact = ModelArtifact::new(
            ensemble,
            self.params,
            train.len(),
            dataset.fingerprint.clone(),
        );
        timed(Stage::Persist, || self.models.put_model(&artifact))?;
        info!(path = %self.models.path().display(), "model saved");

        Ok(TrainingReport {
            total_rows,
            skipped_rows: dataset.skipped,
            train_rows: train.len(),
            validation_rows: validation.len(),
            dataset_fingerprint: dataset.fingerprint,
            evaluation,
            artifact_path: self.models.path().to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(days: i64, miles: f64, receipts: f64) -> TrainingExample {
        TrainingExample {
            record: TripRecord::new(days, miles, receipts),
            expected_output: 0.0,
        }
    }

    #[test]
    fn split_sorts_then_slices() {
        let examples = vec![
            example(5, 10.0, 1.0),
            example(1, 300.0, 2.0),
            example(1, 20.0, 9.0),
            example(3, 1.0, 1.0),
            example(1, 20.0, 3.0),
        ];
        let (train, validation) = split_partitions(examples, |e| &e.record).unwrap();
        let keys: Vec<(i64, f64, f64)> = train
            .iter()
            .chain(&validation)
            .map(|e| (e.record.duration_days, e.record.miles_traveled, e.record.receipts_amount))
            .collect();
        assert_eq!(
            keys,
            vec![
                (1, 20.0, 3.0),
                (1, 20.0, 9.0),
                (1, 300.0, 2.0),
                (3, 1.0, 1.0),
                (5, 10.0, 1.0),
            ]
        );
        assert_eq!(train.len(), 4);
        assert_eq!(validation.len(), 1);
    }

    #[test]
    fn split_floors_the_training_share() {
        let examples: Vec<_> = (0..7).map(|i| example(i, 0.0, 0.0)).collect();
        let (train, validation) = split_partitions(examples, |e| &e.record).unwrap();
        assert_eq!((train.len(), validation.len()), (5, 2));
    }

    #[test]
    fn single_example_cannot_be_split() {
        assert!(matches!(
            split_partitions(vec![example(1, 1.0, 1.0)], |e| &e.record),
            Err(TrainingDataError::TooSmall(1))
        ));
    }
}
