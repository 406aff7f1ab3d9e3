//! Data fetchers
//!
//! Layers, outermost first:
//!
//! - [`polygon`] - Polygon endpoints and their payload types
//! - [`pagination`] - JSON and cursor-paginated CSV request shapes
//! - [`http`] - One logical request with rate limiting, timeout and retries
//! - [`transport`] - The network seam, implemented with reqwest

use crate::downloader::rate_limit::RateLimitError;
use crate::output::OutputError;
use reqwest::StatusCode;

pub mod http;
pub mod pagination;
pub mod polygon;
pub mod retry_formatter;
pub mod transport;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// A single attempt exceeded its deadline
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The API rejected the request for exceeding the rate limit (429)
    #[error("rate limit exceeded")]
    RateLimited,

    /// Any status other than success, not-found or rate-limited
    #[error("request failed with status {status}")]
    RequestFailed {
        /// HTTP status returned by the API
        status: StatusCode,
    },

    /// Connection, DNS or body read failure
    #[error("network error: {0}")]
    NetworkError(String),

    /// Response body could not be decoded
    #[error("parse error: {0}")]
    ParseError(String),

    /// Response was well-formed but unusable
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Every attempt of one logical request failed
    #[error("all {attempts} attempts failed, last error: {last}")]
    ExhaustedRetries {
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        last: Box<FetcherError>,
    },

    /// Rate limiter refused the request
    #[error("rate limiter error: {0}")]
    RateLimiter(#[from] RateLimitError),

    /// The sink receiving response data failed
    #[error("sink error: {0}")]
    Sink(#[from] OutputError),
}

impl FetcherError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetcherError::Timeout(_)
                | FetcherError::RateLimited
                | FetcherError::RequestFailed { .. }
                | FetcherError::NetworkError(_)
        )
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;
