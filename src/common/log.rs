//! Logging setup emitting JSON lines (or plain text) on stderr.
//!
//! Stdout is reserved for command results, so every layer writes to stderr.

use tracing_subscriber::EnvFilter;

use crate::common::config::{AppCfg, LogFormat};

/// Install the global subscriber. Repeated calls are ignored.
pub fn init(cfg: &AppCfg) {
    let filter = EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let _ = match cfg.log_format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Text => builder.try_init(),
    };
}
