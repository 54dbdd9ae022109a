// lib.rs - travel reimbursement core
pub mod api;
pub mod common;
pub mod data;
pub mod evaluation;
pub mod features;
pub mod inference;
pub mod training;

pub use data::domain::TripRecord;
pub use inference::{fallback, Assessment, PredictionSource, Reimburser};
