//! Print the reimbursement for `duration miles receipts`.
//!
//! Always exits 0; malformed input prints `0.0`.

use std::io;

use reimburse::api::cli;
use reimburse::common::config::{self, AppCfg};
use reimburse::common::log;
use reimburse::Reimburser;

fn main() {
    dotenv::dotenv().ok();
    let (cfg, cfg_error) = match AppCfg::load() {
        Ok(cfg) => (cfg, None),
        Err(err) => (AppCfg::default(), Some(err)),
    };
    let cfg = config::install(cfg);
    log::init(cfg);
    if let Some(err) = cfg_error {
        tracing::warn!(error = %err, "invalid configuration, using defaults");
    }

    let reimburser = Reimburser::from_config();
    let stdout = io::stdout();
    if let Err(err) = cli::run_calculate(std::env::args().skip(1), &reimburser, &mut stdout.lock()) {
        tracing::error!(error = %err, "failed to write result");
    }
}
