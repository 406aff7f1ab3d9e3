//! Backfill commands
//!
//! `backfill` walks every weekday of a range; `day` downloads a single date.
//! Both share the global connection, rate and output flags.

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use super::CliError;
use crate::calendar::weekdays;
use crate::downloader::config::{API_KEY_ENV, DEFAULT_BASE_URL, MAX_CONCURRENCY};
use crate::downloader::{DayDownloader, DayReport, DownloadConfig, ProgressReporter};
use crate::exclusions::load_exclusions;
use crate::fetcher::polygon::PolygonClient;
use crate::metrics::init_metrics;
use crate::output::OutputPaths;

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Command line interface
#[derive(Parser, Debug)]
#[command(name = "polygon-backfill")]
#[command(about = "Backfill daily US equity tickers and trades from Polygon.io", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Data root directory; files go to {data-dir}/tickers and {data-dir}/trades
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    /// Polygon API key
    #[arg(long, global = true, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// API base URL
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Ticker tasks in flight per stage (default: 100, max: 1000)
    #[arg(long, global = true, default_value = "100", value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Retries after the first attempt of each request (range: 0-20)
    #[arg(
        long,
        global = true,
        default_value = "6",
        value_parser = clap::value_parser!(u32).range(0..=20)
    )]
    pub max_retries: u32,

    /// Requests per second shared by all tasks
    #[arg(
        long,
        global = true,
        default_value = "400",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub rate_limit: u32,

    /// Deadline of each request attempt in seconds
    #[arg(
        long,
        global = true,
        default_value = "5",
        value_parser = clap::value_parser!(u64).range(1..=300)
    )]
    pub request_timeout_secs: u64,

    /// Disable progress bars
    #[arg(long, global = true, default_value_t = false)]
    pub no_progress: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// Commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download every weekday of a date range
    Backfill(BackfillArgs),

    /// Download a single date
    Day(DayArgs),
}

/// Options shared by both commands
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// File of tickers to skip, one per line
    #[arg(long)]
    pub exclude: Option<PathBuf>,

    /// Download dates whose output files already exist
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

/// Arguments of `backfill`
#[derive(Args, Debug)]
pub struct BackfillArgs {
    /// First date (YYYY-MM-DD)
    #[arg(long)]
    pub from: NaiveDate,

    /// Last date, inclusive (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub options: RunOptions,
}

/// Arguments of `day`
#[derive(Args, Debug)]
pub struct DayArgs {
    /// Date to download (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub options: RunOptions,
}

/// Outcome of a command over all of its dates
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Reports of downloaded days
    pub reports: Vec<DayReport>,
    /// Days skipped because their output existed
    pub skipped: Vec<NaiveDate>,
    /// Days that failed and were removed
    pub failed: Vec<NaiveDate>,
}

impl Cli {
    /// Dates the command covers, ascending
    pub fn dates(&self) -> Result<Vec<NaiveDate>, CliError> {
        match &self.command {
            Commands::Backfill(args) => {
                let to = args.to.unwrap_or_else(|| Utc::now().date_naive());
                Ok(weekdays(args.from, to)?)
            }
            Commands::Day(args) => Ok(vec![args.date]),
        }
    }

    /// Options of the selected command
    pub fn options(&self) -> &RunOptions {
        match &self.command {
            Commands::Backfill(args) => &args.options,
            Commands::Day(args) => &args.options,
        }
    }

    /// Request settings from the global flags
    pub fn download_config(&self) -> Result<DownloadConfig, CliError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                CliError::ConfigurationError(format!(
                    "missing API key: pass --api-key or set {API_KEY_ENV}"
                ))
            })?;

        Ok(DownloadConfig::new(api_key)
            .with_base_url(self.base_url.clone())
            .with_max_retries(self.max_retries)
            .with_concurrency(self.concurrency)
            .with_rate_limit(self.rate_limit)
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs)))
    }

    /// Progress reporter selected by `--no-progress`
    pub fn progress(&self) -> ProgressReporter {
        if self.no_progress {
            ProgressReporter::hidden()
        } else {
            ProgressReporter::new()
        }
    }

    /// Run the selected command, drawing stage bars through `progress`
    ///
    /// Every date is attempted; failed dates are logged, their partial output is
    /// removed and the command fails at the end.
    pub async fn execute(&self, progress: ProgressReporter) -> Result<RunSummary, CliError> {
        let config = self.download_config()?;
        let dates = self.dates()?;
        let options = self.options();
        let exclusions = match &options.exclude {
            Some(path) => load_exclusions(path)?,
            None => HashSet::new(),
        };

        if let Some(addr) = self.metrics_addr {
            init_metrics(addr)?;
        }

        let downloader = DayDownloader::new(
            PolygonClient::new(&config)?,
            OutputPaths::new(&self.data_dir),
            exclusions,
        )
        .with_concurrency(config.concurrency)
        .with_progress(progress);

        info!(
            "Processing {} days into {}",
            dates.len(),
            self.data_dir.display()
        );

        let mut summary = RunSummary::default();
        for date in &dates {
            match downloader.day_unless_complete(*date, options.force).await {
                Ok(Some(report)) => summary.reports.push(report),
                Ok(None) => summary.skipped.push(*date),
                Err(e) => {
                    error!("Day {} failed: {}", date, e);
                    summary.failed.push(*date);
                }
            }
        }

        info!(
            "Finished: {} downloaded, {} skipped, {} failed",
            summary.reports.len(),
            summary.skipped.len(),
            summary.failed.len()
        );

        if summary.failed.is_empty() {
            Ok(summary)
        } else {
            Err(CliError::DaysFailed {
                failed: summary.failed.len(),
                total: dates.len(),
            })
        }
    }
}
