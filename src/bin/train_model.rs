//! Offline trainer: fits the model on labelled cases and writes the artefact.

use anyhow::{Context, Result};
use clap::Parser;

use reimburse::api::cli::TrainArgs;
use reimburse::common::config::{self, AppCfg};
use reimburse::common::log;
use reimburse::data::repo_fs::FsCaseRepo;
use reimburse::training::repo_fs::FsModelRepo;
use reimburse::training::{BoosterParams, TrainingPipeline};

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = TrainArgs::parse();

    let mut cfg = AppCfg::load().context("invalid configuration")?;
    if std::env::var_os("REIMBURSE_LOG").is_none() {
        cfg.log_filter = "info".to_string();
    }
    if let Some(data) = args.data {
        cfg.data_path = data;
    }
    if let Some(model) = args.model {
        cfg.model_path = model;
    }
    let cfg = config::install(cfg);
    log::init(cfg);

    let mut params = BoosterParams::default().with_seed(cfg.pins.seed);
    if let Some(rounds) = args.rounds {
        params = params.with_rounds(rounds);
    }
    tracing::info!(
        data = %cfg.data_path.display(),
        model = %cfg.model_path.display(),
        rounds = params.rounds,
        seed = params.sampling.seed,
        threads = cfg.pins.threads,
        "starting training run"
    );

    let pipeline = TrainingPipeline::new(
        FsCaseRepo::new(&cfg.data_path),
        FsModelRepo::new(&cfg.model_path),
        params,
    );
    let report = pipeline.run().map_err(|err| {
        tracing::error!(code = err.code() as u32, error = %err, "training failed");
        anyhow::Error::new(err).context(format!(
            "training on {} failed; no model written",
            cfg.data_path.display()
        ))
    })?;

    println!("{report}");
    Ok(())
}
