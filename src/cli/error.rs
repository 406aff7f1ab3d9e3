//! CLI error types and conversions

use crate::calendar::CalendarError;
use crate::downloader::DownloadError;
use crate::exclusions::ExclusionError;
use crate::fetcher::FetcherError;
use crate::metrics::MetricsError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Download error
    #[error("download error: {0}")]
    DownloadError(#[from] DownloadError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Exclusion list error
    #[error("{0}")]
    ExclusionError(#[from] ExclusionError),

    /// Metrics exporter error
    #[error("{0}")]
    MetricsError(#[from] MetricsError),

    /// Invalid date range
    #[error("invalid argument: {0}")]
    CalendarError(#[from] CalendarError),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Some dates produced no output
    #[error("{failed} of {total} days failed")]
    DaysFailed {
        /// Days that failed
        failed: usize,
        /// Days attempted
        total: usize,
    },
}
