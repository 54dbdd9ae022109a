//! Ingestion of labelled cases: parse, alias, skip what is unusable.

use serde_json::Value;
use tracing::{debug, warn};

use crate::common::error::TrainingDataError;
use crate::common::ids::Fingerprint;

use super::domain::{Dataset, RawCase, TrainingExample};
use super::repo_fs::FsCaseRepo;

/// Load and normalise every usable case from the repository.
pub fn ingest(repo: &FsCaseRepo) -> Result<Dataset, TrainingDataError> {
    let bytes = repo.read_all()?;
    let dataset = parse_cases(&bytes)?;
    debug!(
        path = %repo.path().display(),
        rows = dataset.examples.len(),
        skipped = dataset.skipped,
        fingerprint = %dataset.fingerprint,
        "ingested case file"
    );
    Ok(dataset)
}

/// Parse a JSON array of cases. Individual malformed cases are skipped and
/// logged; an empty result is fatal.
pub fn parse_cases(bytes: &[u8]) -> Result<Dataset, TrainingDataError> {
    let items: Vec<Value> = serde_json::from_slice(bytes)?;
    let mut examples = Vec::with_capacity(items.len());
    let mut skipped = 0usize;

    for (index, item) in items.into_iter().enumerate() {
        match decode_case(item) {
            Ok(example) => examples.push(example),
            Err(reason) => {
                skipped += 1;
                warn!(index, %reason, "skipping malformed case");
            }
        }
    }

    if examples.is_empty() {
        return Err(TrainingDataError::Empty { skipped });
    }

    Ok(Dataset {
        examples,
        skipped,
        fingerprint: Fingerprint::of(bytes),
    })
}

fn decode_case(item: Value) -> Result<TrainingExample, String> {
    let raw: RawCase = serde_json::from_value(item).map_err(|err| err.to_string())?;
    raw.into_example()
        .ok_or_else(|| "missing trip_duration_days".to_string())
}
