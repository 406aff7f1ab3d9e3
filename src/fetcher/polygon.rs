//! Polygon.io endpoints
//!
//! Paths and payload types of the three endpoints a day's backfill touches:
//! grouped daily bars (ticker discovery), ticker details and trades.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

use crate::downloader::config::DownloadConfig;
use crate::downloader::rate_limit::RateLimiter;
use crate::fetcher::http::ResilientHttpClient;
use crate::fetcher::pagination::{PageStats, PaginatedFetcher};
use crate::fetcher::transport::{ReqwestTransport, Transport};
use crate::fetcher::FetcherResult;
use crate::output::PageSink;
use crate::{GroupedDaily, TickerDetail};

/// Client for the Polygon endpoints used by the backfill
#[derive(Clone)]
pub struct PolygonClient {
    fetcher: PaginatedFetcher,
    trades_page_limit: u32,
}

impl PolygonClient {
    /// Client over the network with its own rate limiter
    pub fn new(config: &DownloadConfig) -> FetcherResult<Self> {
        let transport = ReqwestTransport::new(config.api_key.clone())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Client over any transport
    ///
    /// # Arguments
    /// * `config` - Base URL, retry, timeout and rate budget settings
    /// * `transport` - Network seam, scripted in tests
    pub fn with_transport(config: &DownloadConfig, transport: Arc<dyn Transport>) -> Self {
        let limiter = Arc::new(RateLimiter::per_second(config.rate_limit_per_second));
        let http = ResilientHttpClient::new(transport, limiter, config.max_retries)
            .with_request_timeout(config.request_timeout);
        Self {
            fetcher: PaginatedFetcher::new(http, config.base_url.clone()),
            trades_page_limit: config.trades_page_limit,
        }
    }

    /// Every ticker that traded on `date`
    ///
    /// A date with no data (404 or no `results`) yields an empty list.
    pub async fn grouped_daily(&self, date: NaiveDate) -> FetcherResult<Vec<GroupedDaily>> {
        let path = format!("/v2/aggs/grouped/locale/us/market/stocks/{}", ymd(date));
        let summaries: Vec<GroupedDaily> =
            self.fetcher.fetch_json(&path).await?.unwrap_or_default();
        debug!("{} grouped daily bars for {}", summaries.len(), date);
        Ok(summaries)
    }

    /// Reference data of one ticker as of `date`, `None` if unknown
    pub async fn ticker_detail(
        &self,
        ticker: &str,
        date: NaiveDate,
    ) -> FetcherResult<Option<TickerDetail>> {
        let path = format!(
            "/v3/reference/tickers/{}?date={}",
            urlencoding::encode(ticker),
            ymd(date)
        );
        self.fetcher.fetch_json(&path).await
    }

    /// Stream every trade page of one ticker on `date` into `sink`
    pub async fn trades<S>(
        &self,
        ticker: &str,
        date: NaiveDate,
        sink: &mut S,
    ) -> FetcherResult<PageStats>
    where
        S: PageSink + ?Sized,
    {
        let path = format!(
            "/v3/trades/{}?timestamp={}&limit={}",
            urlencoding::encode(ticker),
            ymd(date),
            self.trades_page_limit
        );
        self.fetcher.fetch_csv(&path, sink).await
    }
}

/// `YYYY-MM-DD` form used in paths and query strings
pub fn ymd(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
