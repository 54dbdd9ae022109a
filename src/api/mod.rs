//! Public entry points used by the binaries.

pub mod cli;
