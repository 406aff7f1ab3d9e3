//! Retry message formatting for the resilient HTTP client.
//!
//! Retried failures are logged as one readable line; exhausted requests get a
//! multi-line summary naming the endpoint and the last error.

use reqwest::StatusCode;
use std::time::Duration;

use crate::fetcher::FetcherError;

/// Classification of retry errors for log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// The attempt exceeded its deadline
    Timeout,
    /// HTTP 429 rate limit exceeded
    RateLimit,
    /// HTTP 5xx server error
    ServerError(u16),
    /// HTTP 4xx other than 404 and 429
    ClientError(u16),
    /// Connection refused, DNS failure, reset while reading the body
    Network,
    /// Anything else
    Other,
}

impl RetryErrorType {
    /// Classify a fetcher error.
    pub fn from_error(err: &FetcherError) -> Self {
        match err {
            FetcherError::Timeout(_) => Self::Timeout,
            FetcherError::RateLimited => Self::RateLimit,
            FetcherError::RequestFailed { status } => Self::from_status(*status),
            FetcherError::NetworkError(_) => Self::Network,
            FetcherError::ExhaustedRetries { last, .. } => Self::from_error(last),
            _ => Self::Other,
        }
    }

    /// Classify a non-success status.
    pub fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimit
        } else if status.is_server_error() {
            Self::ServerError(status.as_u16())
        } else if status.is_client_error() {
            Self::ClientError(status.as_u16())
        } else {
            Self::Other
        }
    }

    /// Short description used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Timeout => "request timeout",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::ClientError(code) => match code {
                401 | 403 => "authentication failed",
                _ => "client error",
            },
            Self::Network => "network error",
            Self::Other => "request error",
        }
    }

    /// Suggested remediation shown with final failures.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Timeout | Self::Network => "Check network connectivity to the API host",
            Self::RateLimit => "Lower --rate-limit or --concurrency",
            Self::ServerError(_) => "The API may be degraded, try the date again later",
            Self::ClientError(401 | 403) => "Verify the API key and plan entitlements",
            Self::ClientError(_) | Self::Other => "Review the request URL and parameters",
        }
    }
}

/// Context for one retried or failed request.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Attempt that just failed (1-based)
    pub attempt: u32,
    /// Total attempts allowed
    pub max_attempts: u32,
    /// Type of the failure
    pub error_type: RetryErrorType,
    /// Wait before the next attempt
    pub backoff_duration: Duration,
    /// Failed URL
    pub endpoint: String,
    /// Display of the underlying error
    pub error_message: String,
}

impl RetryContext {
    /// Build a context from the error of a failed attempt.
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        err: &FetcherError,
        backoff_duration: Duration,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type: RetryErrorType::from_error(err),
            backoff_duration,
            endpoint: endpoint.into(),
            error_message: err.to_string(),
        }
    }

    /// One-line retry message.
    pub fn format_retry(&self) -> String {
        format!(
            "{} {}/{} failed ({}). Retrying in {} seconds.",
            self.endpoint,
            self.attempt,
            self.max_attempts,
            self.error_type.description(),
            self.backoff_duration.as_secs()
        )
    }

    /// Summary logged when every attempt failed.
    pub fn format_failure(&self) -> String {
        [
            format!("[FAILED] Request failed after {} attempts", self.max_attempts),
            format!("  Endpoint: {}", self.endpoint),
            format!("  Last error: {}", self.error_message),
            format!("  Suggestion: {}", self.error_type.suggestion()),
        ]
        .join("\n")
    }
}
