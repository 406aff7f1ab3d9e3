//! Scripted in-memory transport shared by the test suites

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use polygon_backfill::downloader::DownloadConfig;
use polygon_backfill::fetcher::transport::{Accept, ApiResponse, Transport};
use polygon_backfill::fetcher::{FetcherError, FetcherResult};
use reqwest::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

pub const BASE_URL: &str = "http://api.test";

/// One scripted answer
#[derive(Debug, Clone)]
pub enum Reply {
    /// A response with status, body and optional `Link` header
    Response(ApiResponse),
    /// Connection failure
    NetworkError,
    /// Never answers
    Hang,
}

impl Reply {
    pub fn status(status: StatusCode) -> Self {
        Reply::Response(ApiResponse::new(status, Bytes::new()))
    }

    pub fn json(body: serde_json::Value) -> Self {
        Reply::Response(ApiResponse::new(StatusCode::OK, body.to_string()))
    }

    pub fn raw_json(body: &'static str) -> Self {
        Reply::Response(ApiResponse::new(StatusCode::OK, body))
    }

    pub fn csv(body: &str, next: Option<String>) -> Self {
        let response = ApiResponse::new(StatusCode::OK, body.to_string());
        Reply::Response(match next {
            Some(url) => response.with_link(format!("<{url}>; rel=\"next\"")),
            None => response,
        })
    }
}

/// A request seen by the transport
#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub accept: Accept,
    pub at: Instant,
}

/// Answers each URL from its own reply queue; the last reply repeats
///
/// Unscripted URLs answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the replies for a path under [`BASE_URL`]
    pub fn on(&self, path: &str, replies: impl IntoIterator<Item = Reply>) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url(path), replies.into_iter().collect());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        let target = url(path);
        self.calls()
            .into_iter()
            .filter(|call| call.url == target)
            .collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.calls_to(path).len()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Reply::status(StatusCode::NOT_FOUND)),
            None => Reply::status(StatusCode::NOT_FOUND),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, accept: Accept) -> FetcherResult<ApiResponse> {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            accept,
            at: Instant::now(),
        });

        match self.next_reply(url) {
            Reply::Response(response) => Ok(response),
            Reply::NetworkError => Err(FetcherError::NetworkError("connection reset".into())),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Absolute URL of a path under [`BASE_URL`]
pub fn url(path: &str) -> String {
    format!("{BASE_URL}{path}")
}

/// Config pointing at [`BASE_URL`]
pub fn config(max_retries: u32) -> DownloadConfig {
    DownloadConfig::new("test-key")
        .with_base_url(BASE_URL)
        .with_max_retries(max_retries)
}

/// Decompress an output file to text
pub fn read_zst(path: &std::path::Path) -> String {
    let raw = std::fs::read(path).unwrap();
    String::from_utf8(zstd::decode_all(raw.as_slice()).unwrap()).unwrap()
}
