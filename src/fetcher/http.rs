//! Resilient HTTP client
//!
//! Executes one logical request against the API:
//! - one rate limit token per attempt
//! - a fixed deadline per attempt, owned by that attempt alone
//! - 200 and 404 returned as terminal results
//! - 429 drains the shared rate budget before retrying
//! - quadratic backoff between attempts (1s, 4s, 9s, ...)

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::downloader::config::{calculate_backoff, REQUEST_TIMEOUT};
use crate::downloader::rate_limit::RateLimiter;
use crate::fetcher::retry_formatter::RetryContext;
use crate::fetcher::transport::{Accept, ApiResponse, Transport};
use crate::fetcher::{FetcherError, FetcherResult};
use reqwest::StatusCode;

/// Request executor with timeout, retry and shared rate limiting
#[derive(Clone)]
pub struct ResilientHttpClient {
    transport: Arc<dyn Transport>,
    rate_limiter: Arc<RateLimiter>,
    request_timeout: Duration,
    max_retries: u32,
}

impl ResilientHttpClient {
    /// Create a client
    ///
    /// # Arguments
    /// * `transport` - Network transport
    /// * `rate_limiter` - Limiter shared with every other client of the same API
    /// * `max_retries` - Retries after the first attempt used by [`Self::get`]
    pub fn new(
        transport: Arc<dyn Transport>,
        rate_limiter: Arc<RateLimiter>,
        max_retries: u32,
    ) -> Self {
        Self {
            transport,
            rate_limiter,
            request_timeout: REQUEST_TIMEOUT,
            max_retries,
        }
    }

    /// Override the per-attempt timeout
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Shared rate limiter
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Execute a request with the configured retry budget
    pub async fn get(&self, url: &str, accept: Accept) -> FetcherResult<ApiResponse> {
        self.execute(url, accept, self.max_retries).await
    }

    /// Execute a request, making at most `max_retries + 1` attempts
    ///
    /// # Returns
    /// The first 200 or 404 response
    ///
    /// # Errors
    /// [`FetcherError::ExhaustedRetries`] carrying the last failure once every
    /// attempt failed, or [`FetcherError::RateLimiter`] if a token can never be
    /// granted.
    pub async fn execute(
        &self,
        url: &str,
        accept: Accept,
        max_retries: u32,
    ) -> FetcherResult<ApiResponse> {
        let max_attempts = max_retries.saturating_add(1);
        let mut attempt: u32 = 0;

        loop {
            let err = match self.attempt(url, accept).await {
                Ok(response) => {
                    if attempt > 0 {
                        debug!(url, attempt = attempt + 1, "Request succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => err,
            };

            attempt += 1;
            if attempt >= max_attempts {
                let context = RetryContext::new(attempt, max_attempts, &err, Duration::ZERO, url);
                debug!("{}", context.format_failure());
                return Err(FetcherError::ExhaustedRetries {
                    attempts: max_attempts,
                    last: Box::new(err),
                });
            }

            let wait = calculate_backoff(attempt);
            let context = RetryContext::new(attempt, max_attempts, &err, wait, url);
            warn!(
                url,
                attempt,
                max_attempts,
                wait_secs = wait.as_secs(),
                error = %err,
                "{}",
                context.format_retry()
            );
            metrics::counter!("http_retries_total").increment(1);
            metrics::histogram!("retry_backoff_duration_seconds").record(wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
    }

    /// One attempt: take a token, send under a fresh deadline, classify the status
    async fn attempt(&self, url: &str, accept: Accept) -> FetcherResult<ApiResponse> {
        self.rate_limiter.acquire(1).await?;
        metrics::counter!("http_requests_total").increment(1);

        let started = Instant::now();
        // The deadline future is dropped with this attempt
        let result = tokio::time::timeout(self.request_timeout, self.transport.get(url, accept))
            .await
            .map_err(|_| FetcherError::Timeout(self.request_timeout))?;
        metrics::histogram!("http_request_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        let response = result?;
        match response.status {
            StatusCode::OK | StatusCode::NOT_FOUND => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => {
                metrics::counter!("http_429_errors_total").increment(1);
                self.rate_limiter.force_drain();
                Err(FetcherError::RateLimited)
            }
            status => Err(FetcherError::RequestFailed { status }),
        }
    }
}
