//! Command-line interface for imgforge.
//!
//! Provides commands for running the preprocessing pipeline, packing
//! image directories into archives, and inspecting the result cache.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
