//! Per-day download outcome

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counts produced by one day's backfill
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayReport {
    /// Date processed
    pub date: NaiveDate,
    /// Distinct tickers discovered after exclusions
    pub discovered: usize,
    /// Rows written to the tickers file
    pub details_written: usize,
    /// Tickers dropped as test instruments
    pub test_tickers: Vec<String>,
    /// Tickers whose detail request failed
    pub failed_details: Vec<String>,
    /// Tickers whose trades were fetched completely
    pub trade_tickers: usize,
    /// Tickers whose trade request failed
    pub failed_trades: Vec<String>,
    /// Rows written to the trades file
    pub trade_rows: u64,
}

impl DayReport {
    /// Empty report for a date
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    /// Whether any ticker failed in either stage
    pub fn has_failures(&self) -> bool {
        !self.failed_details.is_empty() || !self.failed_trades.is_empty()
    }
}

impl fmt::Display for DayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} tickers, {} details ({} test, {} failed), {} trade tickers ({} failed), {} trade rows",
            self.date,
            self.discovered,
            self.details_written,
            self.test_tickers.len(),
            self.failed_details.len(),
            self.trade_tickers,
            self.failed_trades.len(),
            self.trade_rows
        )
    }
}
