//! Shared utilities that glue the different domains together.
pub mod config;
pub mod error;
pub mod ids;
pub mod log;
pub mod money;

pub use error::{ErrorCode, ReimburseError, ReimburseResult};
