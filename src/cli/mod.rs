//! CLI command implementations

pub mod backfill;
pub mod error;

pub use backfill::{BackfillArgs, Cli, Commands, DayArgs, RunOptions, RunSummary};
pub use error::CliError;
