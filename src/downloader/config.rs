//! Download configuration constants and runtime settings

use std::time::Duration;

/// Default Polygon.io REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "POLYGON_KEY";

/// Retries after the first attempt (7 attempts in total).
pub const MAX_RETRIES: u32 = 6;

/// Per-attempt deadline covering the request and the body read.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP connect timeout for the shared HTTP client.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Requests admitted per rate limit window.
pub const RATE_LIMIT_PER_SECOND: u32 = 400;

/// Rows requested per trades page (the API maximum).
pub const TRADES_PAGE_LIMIT: u32 = 50_000;

/// Concurrent ticker tasks per stage.
/// Polygon starts throttling past roughly 100 open connections.
pub const DEFAULT_CONCURRENCY: usize = 100;

/// Upper bound accepted for `--concurrency`
pub const MAX_CONCURRENCY: usize = 1_000;

/// Quadratic backoff before retry number `attempt` (1-based)
///
/// Waits 1s before the second attempt, 4s before the third, and so on.
pub fn calculate_backoff(attempt: u32) -> Duration {
    let secs = u64::from(attempt).saturating_mul(u64::from(attempt));
    Duration::from_secs(secs)
}

/// Runtime settings shared by the fetch layer and the orchestrator
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// API base URL without trailing slash
    pub base_url: String,
    /// Bearer token for the API
    pub api_key: String,
    /// Retries after the first attempt for each request
    pub max_retries: u32,
    /// Per-attempt timeout
    pub request_timeout: Duration,
    /// Requests per second across all tasks
    pub rate_limit_per_second: u32,
    /// Concurrent ticker tasks per stage
    pub concurrency: usize,
    /// Rows per trades page
    pub trades_page_limit: u32,
}

impl DownloadConfig {
    /// Settings with defaults for everything but the API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            max_retries: MAX_RETRIES,
            request_timeout: REQUEST_TIMEOUT,
            rate_limit_per_second: RATE_LIMIT_PER_SECOND,
            concurrency: DEFAULT_CONCURRENCY,
            trades_page_limit: TRADES_PAGE_LIMIT,
        }
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Override the concurrency bound
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Override the shared request rate
    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.rate_limit_per_second = per_second.max(1);
        self
    }

    /// Override the per-attempt timeout
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}
