//! Download orchestration and rate limiting
//!
//! # Overview
//!
//! A backfill processes one date at a time:
//!
//! 1. **Configuration**: defaults and backoff in [`config`]
//! 2. **Rate Limiting**: one [`rate_limit::RateLimiter`] shared by every request
//! 3. **Execution**: [`executor::DayDownloader`] runs the day's stages
//! 4. **Reporting**: each day yields a [`job::DayReport`]; [`progress`] draws the
//!    stages on the terminal
//!
//! # Quick Start
//!
//! ```no_run
//! use polygon_backfill::downloader::{DayDownloader, DownloadConfig};
//! use polygon_backfill::fetcher::polygon::PolygonClient;
//! use polygon_backfill::output::OutputPaths;
//! use chrono::NaiveDate;
//! use std::collections::HashSet;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DownloadConfig::new("api-key").with_concurrency(50);
//! let downloader = DayDownloader::new(
//!     PolygonClient::new(&config)?,
//!     OutputPaths::new("./data"),
//!     HashSet::from(["ZVZZT".to_string()]),
//! )
//! .with_concurrency(config.concurrency);
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! if let Some(report) = downloader.day_unless_complete(date, false).await? {
//!     println!("{report}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Per-ticker failures are logged and reported in the [`job::DayReport`]; they never
//! fail the day. A [`DownloadError`] means the day produced no output:
//! - discovery failed after every retry
//! - an output file could not be written

pub mod config;
pub mod executor;
pub mod job;
pub mod progress;
pub mod rate_limit;

pub use config::DownloadConfig;
pub use executor::DayDownloader;
pub use job::DayReport;
pub use progress::ProgressReporter;
pub use rate_limit::{RateLimitError, RateLimiter};

use crate::fetcher::FetcherError;
use crate::output::OutputError;

/// Errors that abort one day
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Request failure outside a per-ticker task
    #[error("fetcher error: {0}")]
    Fetch(#[from] FetcherError),

    /// Output file failure
    #[error("output error: {0}")]
    Output(#[from] OutputError),
}
