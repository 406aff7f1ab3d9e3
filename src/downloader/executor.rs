//! Per-day backfill orchestration
//!
//! A day runs `Discover -> DetailFetch -> TradeFetch -> Done`:
//!
//! 1. **Discover**: grouped daily bars name every ticker that traded; excluded
//!    tickers are removed and the rest deduplicated and sorted.
//! 2. **DetailFetch**: one task per ticker writes its reference row to the tickers
//!    file. Test instruments and failed tickers drop out here.
//! 3. **TradeFetch**: one task per surviving ticker streams its trade pages, tagged
//!    with the ticker, into the trades file.
//!
//! Tasks of a stage run with bounded concurrency and never abort each other. A
//! failed ticker is logged and excluded; only a failing output file aborts the day.

use chrono::NaiveDate;
use futures::stream;
use futures_util::StreamExt;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, error, info, warn};

use crate::downloader::config::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
use crate::downloader::job::DayReport;
use crate::downloader::progress::ProgressReporter;
use crate::downloader::DownloadError;
use crate::fetcher::pagination::PageStats;
use crate::fetcher::polygon::PolygonClient;
use crate::fetcher::{FetcherError, FetcherResult};
use crate::output::csv::encode_ticker_detail;
use crate::output::{OutputPaths, OutputSink, RecordSink, TaggedRowWriter};
use crate::{trade_response_columns, TickerDetail, TICKER_DETAIL_COLUMNS, TRADE_COLUMNS};

/// Result of one ticker's detail task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailOutcome {
    /// Row written, ticker continues to trades
    Written,
    /// Test instrument, dropped
    Test,
}

/// Downloads complete days into the output layout
pub struct DayDownloader {
    client: PolygonClient,
    paths: OutputPaths,
    exclusions: HashSet<String>,
    concurrency: usize,
    progress: ProgressReporter,
}

impl DayDownloader {
    /// Create a downloader
    ///
    /// # Arguments
    /// * `client` - Polygon client sharing one rate budget across all tasks
    /// * `paths` - Output layout
    /// * `exclusions` - Tickers never fetched
    pub fn new(client: PolygonClient, paths: OutputPaths, exclusions: HashSet<String>) -> Self {
        Self {
            client,
            paths,
            exclusions,
            concurrency: DEFAULT_CONCURRENCY,
            progress: ProgressReporter::hidden(),
        }
    }

    /// Set the number of ticker tasks in flight per stage
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Draw stage progress through `progress`
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Output layout
    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    /// Download `date` unless both of its files exist
    ///
    /// # Returns
    /// `None` if the day was skipped
    pub async fn day_unless_complete(
        &self,
        date: NaiveDate,
        force: bool,
    ) -> Result<Option<DayReport>, DownloadError> {
        if !force && self.paths.day_complete(date) {
            info!("Skipping {}: output already present", date);
            return Ok(None);
        }
        self.day(date).await.map(Some)
    }

    /// Download one day, replacing any previous output
    ///
    /// On failure both files of the day are removed.
    ///
    /// # Errors
    /// [`DownloadError::Fetch`] if discovery fails, [`DownloadError::Output`] if
    /// either output file fails.
    pub async fn day(&self, date: NaiveDate) -> Result<DayReport, DownloadError> {
        info!("Backfilling {}", date);
        let mut report = DayReport::new(date);

        match self.run(date, &mut report).await {
            Ok(()) => {
                if report.has_failures() {
                    warn!("{}", report);
                } else {
                    info!("{}", report);
                }
                metrics::counter!("days_completed_total").increment(1);
                Ok(report)
            }
            Err(e) => {
                error!("Backfill of {} failed: {}", date, e);
                metrics::counter!("days_failed_total").increment(1);
                self.paths.remove_day(date);
                Err(e)
            }
        }
    }

    async fn run(&self, date: NaiveDate, report: &mut DayReport) -> Result<(), DownloadError> {
        let tickers = self.discover(date).await?;
        report.discovered = tickers.len();

        let survivors = self.ticker_details(date, &tickers, report).await?;
        self.trades(date, &survivors, report).await
    }

    /// Tickers that traded on `date`, minus exclusions, deduplicated and sorted
    pub async fn discover(&self, date: NaiveDate) -> Result<Vec<String>, DownloadError> {
        let summaries = self.client.grouped_daily(date).await?;
        let total = summaries.len();

        let tickers: BTreeSet<String> = summaries
            .into_iter()
            .map(|summary| summary.ticker)
            .filter(|ticker| !ticker.is_empty() && !self.exclusions.contains(ticker))
            .collect();

        info!(
            "Discovered {} tickers on {} ({} summaries, {} excluded list entries)",
            tickers.len(),
            date,
            total,
            self.exclusions.len()
        );
        Ok(tickers.into_iter().collect())
    }

    /// Write the tickers file and return the tickers that continue to trades
    ///
    /// # Returns
    /// Real tickers whose row was written, sorted
    pub async fn ticker_details(
        &self,
        date: NaiveDate,
        tickers: &[String],
        report: &mut DayReport,
    ) -> Result<Vec<String>, DownloadError> {
        let sink = OutputSink::create(self.paths.tickers(date), &TICKER_DETAIL_COLUMNS)?;
        let stage = self
            .progress
            .stage(tickers.len() as u64, format!("Ticker details {date}"));

        let mut survivors = Vec::with_capacity(tickers.len());
        {
            let sink = &sink;
            let mut settled = stream::iter(tickers)
                .map(|ticker| async move {
                    let outcome = self.detail_task(ticker, date, sink).await;
                    (ticker, outcome)
                })
                .buffer_unordered(self.concurrency);

            while let Some((ticker, outcome)) = settled.next().await {
                stage.settle();
                match outcome {
                    Ok(DetailOutcome::Written) => survivors.push(ticker.clone()),
                    Ok(DetailOutcome::Test) => report.test_tickers.push(ticker.clone()),
                    Err(FetcherError::Sink(e)) => return Err(DownloadError::Output(e)),
                    Err(e) => {
                        warn!(
                            ticker = %ticker,
                            date = %date,
                            error = %e,
                            "Failed to fetch ticker details"
                        );
                        metrics::counter!("ticker_failures_total", "stage" => "details")
                            .increment(1);
                        report.failed_details.push(ticker.clone());
                    }
                }
            }
        }

        let summary = sink.close().await?;
        report.details_written = summary.rows as usize;
        stage.finish(format!("{} ticker details", summary.rows));

        if !report.test_tickers.is_empty() {
            report.test_tickers.sort();
            info!(
                "Excluding {} test tickers on {}: {}",
                report.test_tickers.len(),
                date,
                report.test_tickers.join(",")
            );
        }
        report.failed_details.sort();

        survivors.sort();
        Ok(survivors)
    }

    async fn detail_task(
        &self,
        ticker: &str,
        date: NaiveDate,
        sink: &OutputSink,
    ) -> FetcherResult<DetailOutcome> {
        let mut detail = match self.client.ticker_detail(ticker, date).await? {
            Some(detail) => detail,
            None => {
                debug!("No details for {} on {}", ticker, date);
                TickerDetail::unknown(ticker)
            }
        };
        if detail.ticker.is_empty() {
            detail.ticker = ticker.to_string();
        }
        if detail.is_test() {
            return Ok(DetailOutcome::Test);
        }

        let row = encode_ticker_detail(&detail)?;
        sink.write_record(row, 1).await?;
        Ok(DetailOutcome::Written)
    }

    /// Write the trades file for `tickers`
    pub async fn trades(
        &self,
        date: NaiveDate,
        tickers: &[String],
        report: &mut DayReport,
    ) -> Result<(), DownloadError> {
        let sink = OutputSink::create(self.paths.trades(date), &TRADE_COLUMNS)?;
        let stage = self
            .progress
            .stage(tickers.len() as u64, format!("Trades {date}"));

        {
            let sink = &sink;
            let mut settled = stream::iter(tickers)
                .map(|ticker| async move {
                    let outcome = self.trade_task(ticker, date, sink).await;
                    (ticker, outcome)
                })
                .buffer_unordered(self.concurrency);

            while let Some((ticker, outcome)) = settled.next().await {
                stage.settle();
                match outcome {
                    Ok((stats, rows)) => {
                        debug!(
                            "{} trades for {} on {} in {} pages",
                            rows, ticker, date, stats.pages
                        );
                        report.trade_tickers += 1;
                    }
                    Err(FetcherError::Sink(e)) => return Err(DownloadError::Output(e)),
                    Err(e) => {
                        warn!(ticker = %ticker, date = %date, error = %e, "Failed to fetch trades");
                        metrics::counter!("ticker_failures_total", "stage" => "trades")
                            .increment(1);
                        report.failed_trades.push(ticker.clone());
                    }
                }
            }
        }

        let summary = sink.close().await?;
        report.trade_rows = summary.rows;
        report.failed_trades.sort();
        stage.finish(format!("{} trade rows", summary.rows));
        Ok(())
    }

    async fn trade_task(
        &self,
        ticker: &str,
        date: NaiveDate,
        sink: &OutputSink,
    ) -> FetcherResult<(PageStats, u64)> {
        let mut writer = TaggedRowWriter::new(sink, ticker, trade_response_columns());
        let stats = self.client.trades(ticker, date, &mut writer).await?;
        let rows = writer.finish().await?;
        Ok((stats, rows))
    }
}
