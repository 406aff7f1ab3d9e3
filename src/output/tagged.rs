//! Header-stripping, ticker-tagging transformer for trade pages
//!
//! The trades endpoint returns CSV pages that each start with the same header line.
//! [`TaggedRowWriter`] drops every copy of that header and prefixes each remaining
//! line with the ticker, so the rows of many tickers can share one output file.
//! Lines may be split across chunks; only complete lines ever reach the sink.

use async_trait::async_trait;
use bytes::Bytes;

use super::{OutputResult, PageSink, RecordSink};

/// Tags the rows of one ticker's trade pages and forwards them to a shared sink
pub struct TaggedRowWriter<'a> {
    sink: &'a dyn RecordSink,
    prefix: Vec<u8>,
    header: Vec<u8>,
    carry: Vec<u8>,
    rows: u64,
}

impl<'a> TaggedRowWriter<'a> {
    /// Create a writer for one ticker
    ///
    /// # Arguments
    /// * `sink` - Shared destination for tagged rows
    /// * `ticker` - Value prepended to every row
    /// * `columns` - Columns of the response header line to strip
    pub fn new(sink: &'a dyn RecordSink, ticker: &str, columns: &[&str]) -> Self {
        Self {
            sink,
            prefix: format!("{ticker},").into_bytes(),
            header: columns.join(",").into_bytes(),
            carry: Vec::new(),
            rows: 0,
        }
    }

    /// Rows forwarded so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush any unterminated final line and return the row count
    pub async fn finish(mut self) -> OutputResult<u64> {
        self.end_page().await?;
        Ok(self.rows)
    }

    /// Append one body line to `out` unless it is blank or the header
    fn tag_line(&self, line: &[u8], out: &mut Vec<u8>) -> u64 {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() || line == self.header.as_slice() {
            return 0;
        }
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(line);
        out.push(b'\n');
        1
    }

    async fn forward(&mut self, batch: Vec<u8>, rows: u64) -> OutputResult<()> {
        if rows == 0 {
            return Ok(());
        }
        self.sink.write_record(Bytes::from(batch), rows).await?;
        self.rows += rows;
        Ok(())
    }
}

#[async_trait]
impl<'a> PageSink for TaggedRowWriter<'a> {
    async fn write_chunk(&mut self, chunk: &[u8]) -> OutputResult<()> {
        let Some(last_newline) = chunk.iter().rposition(|&b| b == b'\n') else {
            self.carry.extend_from_slice(chunk);
            return Ok(());
        };

        let mut pending = std::mem::take(&mut self.carry);
        pending.extend_from_slice(&chunk[..last_newline]);
        self.carry.extend_from_slice(&chunk[last_newline + 1..]);

        let mut batch = Vec::with_capacity(pending.len() + 64);
        let mut rows = 0;
        for line in pending.split(|&b| b == b'\n') {
            rows += self.tag_line(line, &mut batch);
        }
        self.forward(batch, rows).await
    }

    async fn end_page(&mut self) -> OutputResult<()> {
        let line = std::mem::take(&mut self.carry);
        let mut batch = Vec::with_capacity(line.len() + self.prefix.len() + 1);
        let rows = self.tag_line(&line, &mut batch);
        self.forward(batch, rows).await
    }
}
