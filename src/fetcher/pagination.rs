//! JSON and cursor-paginated CSV request shapes
//!
//! - [`PaginatedFetcher::fetch_json`] - one page, payload taken from `results`
//! - [`PaginatedFetcher::fetch_csv`] - pages followed through the `Link` header and
//!   streamed into a [`PageSink`]
//!
//! Not-found is a value in both shapes, never an error.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::fetcher::http::ResilientHttpClient;
use crate::fetcher::transport::Accept;
use crate::fetcher::{FetcherError, FetcherResult};
use crate::output::PageSink;

/// Maximum number of pages followed for one resource
const MAX_PAGES: usize = 10_000;

/// Envelope of every JSON endpoint
#[derive(Debug, Deserialize)]
struct ResultsEnvelope<T> {
    results: Option<T>,
}

/// Pages streamed by one [`PaginatedFetcher::fetch_csv`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    /// Pages written to the sink
    pub pages: usize,
    /// Body bytes written to the sink
    pub bytes: u64,
}

/// Request shapes over a [`ResilientHttpClient`]
#[derive(Clone)]
pub struct PaginatedFetcher {
    http: ResilientHttpClient,
    base_url: String,
}

impl PaginatedFetcher {
    /// Create a fetcher for paths under `base_url`
    pub fn new(http: ResilientHttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URL of an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch one JSON page and return its `results` field
    ///
    /// # Returns
    /// `None` on 404 or when the payload has no `results`
    ///
    /// # Errors
    /// Request failures from the HTTP client, [`FetcherError::RequestFailed`] for
    /// an unexpected status and [`FetcherError::ParseError`] for a malformed body.
    pub async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> FetcherResult<Option<T>> {
        let url = self.url(path);
        let response = self.http.get(&url, Accept::Json).await?;

        match response.status {
            StatusCode::OK => {
                let envelope: ResultsEnvelope<T> = serde_json::from_slice(&response.body)
                    .map_err(|e| FetcherError::ParseError(format!("{url}: {e}")))?;
                Ok(envelope.results)
            }
            StatusCode::NOT_FOUND => {
                debug!("{} not found", url);
                Ok(None)
            }
            status => Err(FetcherError::RequestFailed { status }),
        }
    }

    /// Stream every page of a CSV resource into `sink`
    ///
    /// Each 200 body is one page followed by [`PageSink::end_page`]. A missing
    /// `Link` header or a 404 ends the stream.
    ///
    /// # Errors
    /// Request failures, an unexpected status, a sink failure
    /// ([`FetcherError::Sink`]) or more than `MAX_PAGES` pages.
    pub async fn fetch_csv<S>(&self, path: &str, sink: &mut S) -> FetcherResult<PageStats>
    where
        S: PageSink + ?Sized,
    {
        let mut next = Some(self.url(path));
        let mut stats = PageStats::default();

        while let Some(url) = next.take() {
            if stats.pages >= MAX_PAGES {
                return Err(FetcherError::InvalidResponse(format!(
                    "Max pages ({MAX_PAGES}) exceeded at {url} - possible cursor loop"
                )));
            }

            let response = self.http.get(&url, Accept::Csv).await?;
            match response.status {
                StatusCode::OK => {}
                StatusCode::NOT_FOUND => {
                    debug!("{} not found, ending pagination", url);
                    break;
                }
                status => return Err(FetcherError::RequestFailed { status }),
            }

            sink.write_chunk(&response.body).await?;
            sink.end_page().await?;
            stats.pages += 1;
            stats.bytes += response.body.len() as u64;

            next = response.link.as_deref().and_then(parse_next_link);
            debug!(
                url = %url,
                page = stats.pages,
                bytes = response.body.len(),
                has_next = next.is_some(),
                "Fetched CSV page"
            );
        }

        Ok(stats)
    }
}

/// Extract the URL between `<` and `>` of a `Link` header
///
/// ```
/// use polygon_backfill::fetcher::pagination::parse_next_link;
///
/// assert_eq!(
///     parse_next_link(r#"<https://api.polygon.io/v3/trades/X?cursor=abc>; rel="next""#),
///     Some("https://api.polygon.io/v3/trades/X?cursor=abc".to_string())
/// );
/// assert_eq!(parse_next_link("no brackets"), None);
/// ```
pub fn parse_next_link(header: &str) -> Option<String> {
    let start = header.find('<')? + 1;
    let end = start + header[start..].find('>')?;
    let url = header[start..end].trim();
    (!url.is_empty()).then(|| url.to_string())
}
