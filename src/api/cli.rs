//! Command line boundaries for the inference and training binaries.
//!
//! Inference takes exactly three positional values and must print a number
//! whatever happens, so its arguments are coerced by hand. Training uses
//! `clap`.

use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use tracing::debug;

use crate::common::error::InputParseError;
use crate::common::money::format_amount;
use crate::data::domain::TripRecord;
use crate::inference::domain::ModelSource;
use crate::inference::service::Reimburser;

/// Printed for any malformed input.
pub const SENTINEL: &str = "0.0";

const ARG_NAMES: [&str; 3] = ["trip_duration_days", "miles_traveled", "total_receipts_amount"];

fn coerce<T: FromStr>(name: &'static str, raw: &str) -> Result<T, InputParseError> {
    raw.trim().parse().map_err(|_| InputParseError::NotNumeric {
        name,
        value: raw.to_string(),
    })
}

/// Coerce `duration miles receipts` (program name already stripped).
pub fn parse_trip<I, S>(args: I) -> Result<TripRecord, InputParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args: Vec<S> = args.into_iter().collect();
    let [days, miles, receipts] = args.as_slice() else {
        return Err(InputParseError::ArgumentCount(args.len()));
    };
    Ok(TripRecord::new(
        coerce(ARG_NAMES[0], days.as_ref())?,
        coerce(ARG_NAMES[1], miles.as_ref())?,
        coerce(ARG_NAMES[2], receipts.as_ref())?,
    ))
}

/// Inference entry point: writes either the amount or the sentinel.
pub fn run_calculate<I, S, M>(args: I, reimburser: &Reimburser<M>, out: &mut impl Write) -> io::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    M: ModelSource,
{
    match parse_trip(args) {
        Ok(record) => writeln!(out, "{}", format_amount(reimburser.reimburse(&record))),
        Err(err) => {
            debug!(code = err.code() as u32, error = %err, "rejecting malformed input");
            writeln!(out, "{SENTINEL}")
        }
    }
}

/// Train the reimbursement model from labelled cases
#[derive(Debug, Parser)]
#[command(name = "train-model")]
#[command(about = "Train the reimbursement model from labelled cases")]
pub struct TrainArgs {
    /// Labelled cases (JSON array); defaults to REIMBURSE_DATA_PATH
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Where to write the model artefact; defaults to REIMBURSE_MODEL_PATH
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Override the number of boosting rounds
    #[arg(long)]
    pub rounds: Option<usize>,
}
