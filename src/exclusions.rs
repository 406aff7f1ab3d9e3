//! Static ticker exclusion list
//!
//! A plain text file with one ticker per line. Surrounding whitespace is trimmed
//! and blank lines are ignored.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Exclusion list errors
#[derive(Debug, thiserror::Error)]
pub enum ExclusionError {
    /// The file could not be read
    #[error("failed to read exclusion list {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Parse newline-delimited tickers
pub fn parse_exclusions(text: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load the exclusion list from `path`
pub fn load_exclusions(path: impl AsRef<Path>) -> Result<HashSet<String>, ExclusionError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ExclusionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let tickers = parse_exclusions(&text);
    info!("Loaded {} excluded tickers from {}", tickers.len(), path.display());
    Ok(tickers)
}
