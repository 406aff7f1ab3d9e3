//! Network transport seam
//!
//! [`Transport`] performs exactly one GET and reports the raw outcome. Retries,
//! timeouts and rate limiting live above it in [`super::http`], which keeps the
//! seam small enough to script in tests.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, LINK};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::downloader::config::CONNECT_TIMEOUT;
use crate::fetcher::{FetcherError, FetcherResult};

/// Response body format requested from the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    /// `application/json`
    Json,
    /// `text/csv`
    Csv,
}

impl Accept {
    /// MIME type sent in the `Accept` header
    pub fn mime(&self) -> &'static str {
        match self {
            Accept::Json => "application/json",
            Accept::Csv => "text/csv",
        }
    }
}

/// A fully read API response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Raw `Link` header, if present
    pub link: Option<String>,
    /// Response body
    pub body: Bytes,
}

impl ApiResponse {
    /// Response with a status and body and no `Link` header
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            link: None,
            body: body.into(),
        }
    }

    /// Attach a `Link` header value
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// 200 OK
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// 404 Not Found
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }
}

/// Performs a single GET request
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and read the full body
    ///
    /// Non-success statuses are returned as responses; only failures to get a
    /// response at all are errors.
    async fn get(&self, url: &str, accept: Accept) -> FetcherResult<ApiResponse>;
}

/// reqwest-backed transport authenticating with a bearer token
pub struct ReqwestTransport {
    client: Client,
    api_key: String,
}

impl ReqwestTransport {
    /// Build a transport with a fresh connection pool
    pub fn new(api_key: impl Into<String>) -> FetcherResult<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("polygon-backfill/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetcherError::NetworkError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, api_key))
    }

    /// Wrap an existing client
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, accept: Accept) -> FetcherResult<ApiResponse> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, accept.mime())
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        let status = response.status();
        let link = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| FetcherError::NetworkError(format!("Failed to read body: {e}")))?;

        Ok(ApiResponse { status, link, body })
    }
}
