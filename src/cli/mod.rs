//! Command-line interface for mlops.
//!
//! Provides commands for pipeline upsert and execution, model package
//! registration and approval, and metric-gated endpoint deployment.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
