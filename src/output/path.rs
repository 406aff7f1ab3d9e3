//! Daily file layout
//!
//! Files live in one directory per record kind, named by date:
//!
//! ```text
//! {root}/tickers/2024-01-02.csv.zst
//! {root}/trades/2024-01-02.csv.zst
//! ```

use chrono::NaiveDate;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Kind of daily output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Ticker reference data
    Tickers,
    /// Tagged trades
    Trades,
}

impl RecordKind {
    /// Every kind written for a day
    pub const ALL: [RecordKind; 2] = [RecordKind::Tickers, RecordKind::Trades];

    /// Directory holding files of this kind
    pub fn dir_name(&self) -> &'static str {
        match self {
            RecordKind::Tickers => "tickers",
            RecordKind::Trades => "trades",
        }
    }
}

/// Resolves output paths under a data root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    root: PathBuf,
}

impl OutputPaths {
    /// Layout rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Data root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File of one kind for one date
    pub fn path_for(&self, kind: RecordKind, date: NaiveDate) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join(format!("{}.csv.zst", date.format("%Y-%m-%d")))
    }

    /// Tickers file for a date
    pub fn tickers(&self, date: NaiveDate) -> PathBuf {
        self.path_for(RecordKind::Tickers, date)
    }

    /// Trades file for a date
    pub fn trades(&self, date: NaiveDate) -> PathBuf {
        self.path_for(RecordKind::Trades, date)
    }

    /// Whether both files of a date exist
    ///
    /// Sinks only move a file into place once it is closed, so an existing file
    /// is a finished one.
    pub fn day_complete(&self, date: NaiveDate) -> bool {
        RecordKind::ALL
            .iter()
            .all(|kind| self.path_for(*kind, date).is_file())
    }

    /// Delete whatever files exist for a date, logging failures
    pub fn remove_day(&self, date: NaiveDate) {
        for kind in RecordKind::ALL {
            let path = self.path_for(kind, date);
            match std::fs::remove_file(&path) {
                Ok(()) => warn!("Removed partial output {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}
