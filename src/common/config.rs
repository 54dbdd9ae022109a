//! Runtime configuration loaded from the environment.
//!
//! The snapshot is resolved once at process start and installed with
//! [`install`]; nothing mutates it afterwards.

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::common::error::ConfigError;

pub const DEFAULT_MODEL_PATH: &str = "reimbursement_model.json";
pub const DEFAULT_DATA_PATH: &str = "public_cases.json";
pub const DEFAULT_SEED: u64 = 42;

/// Output format of the log layer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Determinism pins shared by training and inference.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RuntimePins {
    pub threads: usize,
    pub seed: u64,
}

impl Default for RuntimePins {
    fn default() -> Self {
        Self {
            threads: 1,
            seed: DEFAULT_SEED,
        }
    }
}

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug)]
pub struct AppCfg {
    pub model_path: PathBuf,
    pub data_path: PathBuf,
    pub log_filter: String,
    pub log_format: LogFormat,
    pub pins: RuntimePins,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            log_filter: "warn".to_string(),
            log_format: LogFormat::Json,
            pins: RuntimePins::default(),
        }
    }
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a snapshot from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(path) = lookup("REIMBURSE_MODEL_PATH") {
            cfg.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("REIMBURSE_DATA_PATH") {
            cfg.data_path = PathBuf::from(path);
        }
        if let Some(filter) = lookup("REIMBURSE_LOG") {
            cfg.log_filter = filter;
        }
        if let Some(format) = lookup("REIMBURSE_LOG_FORMAT") {
            cfg.log_format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "REIMBURSE_LOG_FORMAT",
                        value: format,
                    })
                }
            };
        }
        if let Some(raw) = lookup("REIMBURSE_THREADS") {
            let threads: usize = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "REIMBURSE_THREADS",
                value: raw.clone(),
            })?;
            if threads != 1 {
                return Err(ConfigError::Threads {
                    key: "REIMBURSE_THREADS",
                    value: threads,
                });
            }
            cfg.pins.threads = threads;
        }
        if let Some(raw) = lookup("REIMBURSE_SEED") {
            cfg.pins.seed = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "REIMBURSE_SEED",
                value: raw.clone(),
            })?;
        }

        Ok(cfg)
    }
}

static CURRENT: OnceLock<AppCfg> = OnceLock::new();

/// Install the process-wide snapshot. The first call wins; later calls return
/// the snapshot already in place.
pub fn install(cfg: AppCfg) -> &'static AppCfg {
    CURRENT.get_or_init(|| cfg)
}

/// The installed snapshot, or defaults when nothing was installed.
pub fn current() -> AppCfg {
    CURRENT.get().cloned().unwrap_or_default()
}
