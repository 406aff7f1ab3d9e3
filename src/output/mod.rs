//! Data output writers
//!
//! - [`decimal`] - Exact plain-decimal rendering of numeric fields
//! - [`csv`] - Header and ticker detail row encoding
//! - [`tagged`] - Header-stripping, ticker-tagging transformer for trade pages
//! - [`sink`] - Shared zstd-compressed output file
//! - [`path`] - Daily file layout

use async_trait::async_trait;
use bytes::Bytes;

pub mod csv;
pub mod decimal;
pub mod path;
pub mod sink;
pub mod tagged;

pub use path::{OutputPaths, RecordKind};
pub use sink::OutputSink;
pub use tagged::TaggedRowWriter;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Compression stream error
    #[error("compression error: {0}")]
    CompressionError(String),

    /// A record did not end with a newline
    #[error("partial record rejected: {0} bytes without trailing newline")]
    PartialRecord(usize),

    /// Write after the sink was closed or failed
    #[error("sink already closed")]
    Closed,
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for complete, newline-terminated records
///
/// Implementations accept concurrent writers; each call's bytes land contiguously.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Append `rows` complete records held in `record`
    ///
    /// A record may span several lines when a quoted field contains a newline, so
    /// the caller supplies the count.
    async fn write_record(&self, record: Bytes, rows: u64) -> OutputResult<()>;
}

/// Receiver of one paginated response body, page by page
#[async_trait]
pub trait PageSink: Send {
    /// Feed the next chunk of the current page
    async fn write_chunk(&mut self, chunk: &[u8]) -> OutputResult<()>;

    /// Mark the end of the current page
    async fn end_page(&mut self) -> OutputResult<()>;
}

/// Collects raw page bytes, mainly for inspection and tests
#[async_trait]
impl PageSink for Vec<u8> {
    async fn write_chunk(&mut self, chunk: &[u8]) -> OutputResult<()> {
        self.extend_from_slice(chunk);
        Ok(())
    }

    async fn end_page(&mut self) -> OutputResult<()> {
        Ok(())
    }
}
