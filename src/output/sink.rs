//! Shared zstd-compressed output file
//!
//! One [`OutputSink`] exists per file and day. Many ticker tasks write to it
//! concurrently; each write is a batch of complete lines and lands contiguously in
//! the compressed stream. The header line is the first content of the stream.
//!
//! Data goes to a temporary file next to the destination and is renamed onto it
//! only by [`OutputSink::close`]. A sink dropped without closing leaves no file
//! at the destination.

use async_trait::async_trait;
use bytes::Bytes;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zstd::stream::write::Encoder;

use super::csv::header_line;
use super::{OutputError, OutputResult, RecordSink};

/// zstd level used for every file (0 selects the library default)
const COMPRESSION_LEVEL: i32 = 0;

type CompressedFile = Encoder<'static, BufWriter<NamedTempFile>>;

/// Totals reported when a sink is closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSummary {
    /// File written
    pub path: PathBuf,
    /// Data rows written, header excluded
    pub rows: u64,
}

/// Concurrent writer of one compressed CSV file
#[derive(Clone)]
pub struct OutputSink {
    path: PathBuf,
    encoder: Arc<Mutex<Option<CompressedFile>>>,
    rows: Arc<AtomicU64>,
}

impl OutputSink {
    /// Open a temporary file beside `path` and write the header
    ///
    /// Any existing file at `path` stays untouched until [`Self::close`] replaces it.
    ///
    /// # Arguments
    /// * `path` - Destination file; parent directories are created
    /// * `columns` - Header columns
    pub fn create(path: impl AsRef<Path>, columns: &[&str]) -> OutputResult<Self> {
        let path = path.as_ref().to_path_buf();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| {
            OutputError::IoError(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;

        let file = NamedTempFile::new_in(parent).map_err(|e| {
            OutputError::IoError(format!(
                "Failed to create temp file for {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut encoder = Encoder::new(BufWriter::new(file), COMPRESSION_LEVEL)
            .map_err(|e| OutputError::CompressionError(e.to_string()))?;
        encoder
            .write_all(header_line(columns).as_bytes())
            .map_err(|e| OutputError::CompressionError(format!("Failed to write header: {e}")))?;

        debug!("Opened {} with {} columns", path.display(), columns.len());

        Ok(Self {
            path,
            encoder: Arc::new(Mutex::new(Some(encoder))),
            rows: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows.load(Ordering::Relaxed)
    }

    /// Finish the compressed frame, sync the file and move it onto the destination
    ///
    /// Writers still holding clones see [`OutputError::Closed`] afterwards.
    pub async fn close(self) -> OutputResult<SinkSummary> {
        let encoder = Arc::clone(&self.encoder);
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> OutputResult<()> {
            let encoder = lock(&encoder).take().ok_or(OutputError::Closed)?;
            let writer = encoder
                .finish()
                .map_err(|e| OutputError::CompressionError(e.to_string()))?;
            let file = writer.into_inner().map_err(|e| {
                OutputError::IoError(format!("Failed to flush {}: {}", path.display(), e))
            })?;
            file.as_file().sync_all().map_err(|e| {
                OutputError::IoError(format!("Failed to sync {}: {}", path.display(), e))
            })?;
            file.persist(&path).map_err(|e| {
                OutputError::IoError(format!("Failed to persist {}: {}", path.display(), e))
            })?;
            Ok(())
        })
        .await
        .map_err(|e| OutputError::IoError(format!("Writer task failed: {e}")))??;

        let summary = SinkSummary {
            path: self.path,
            rows: self.rows.load(Ordering::Relaxed),
        };
        info!("Wrote {} rows to {}", summary.rows, summary.path.display());
        Ok(summary)
    }
}

/// Lock the encoder slot, recovering it if a writer panicked
fn lock(slot: &Mutex<Option<CompressedFile>>) -> MutexGuard<'_, Option<CompressedFile>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl RecordSink for OutputSink {
    /// Append complete lines; a record without a trailing newline is rejected
    async fn write_record(&self, record: Bytes, rows: u64) -> OutputResult<()> {
        if record.is_empty() {
            return Ok(());
        }
        if !record.ends_with(b"\n") {
            return Err(OutputError::PartialRecord(record.len()));
        }
        let encoder = Arc::clone(&self.encoder);

        tokio::task::spawn_blocking(move || -> OutputResult<()> {
            let mut slot = lock(&encoder);
            let stream = slot.as_mut().ok_or(OutputError::Closed)?;
            if let Err(e) = stream.write_all(&record) {
                // A partly written batch leaves the stream unusable
                slot.take();
                return Err(OutputError::CompressionError(format!(
                    "Failed to write record: {e}"
                )));
            }
            Ok(())
        })
        .await
        .map_err(|e| OutputError::IoError(format!("Writer task failed: {e}")))??;

        self.rows.fetch_add(rows, Ordering::Relaxed);
        metrics::counter!("output_rows_written_total").increment(rows);
        Ok(())
    }
}
