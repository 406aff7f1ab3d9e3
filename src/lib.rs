//! # Polygon Backfill Library
//!
//! Downloads daily US equity reference data and trades from the Polygon.io REST API
//! into zstd-compressed CSV files, one file per day and record kind.
//!
//! ## Features
//!
//! - **Global Rate Budget**: one fixed-window token bucket shared by every request,
//!   drained hard when the API answers 429
//! - **Resilient Requests**: per-attempt timeouts with quadratic backoff retries
//! - **Cursor Pagination**: CSV trade pages followed through the `Link` header
//! - **Multiplexed Output**: many concurrent ticker tasks stream complete lines into
//!   one compressed file per day
//! - **Exact Numbers**: numeric fields are rendered as plain decimals, never in
//!   exponent notation
//!
//! ## Quick Start
//!
//! ```no_run
//! use polygon_backfill::downloader::{DayDownloader, DownloadConfig};
//! use polygon_backfill::fetcher::polygon::PolygonClient;
//! use polygon_backfill::output::OutputPaths;
//! use chrono::NaiveDate;
//! use std::collections::HashSet;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DownloadConfig::new(std::env::var("POLYGON_KEY")?);
//! let client = PolygonClient::new(&config)?;
//! let downloader = DayDownloader::new(client, OutputPaths::new("data"), HashSet::new());
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! let report = downloader.day(date).await?;
//! println!("{} tickers written", report.details_written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`downloader`] - Rate limiting, configuration and the per-day orchestration
//! - [`fetcher`] - Transport seam, resilient HTTP client, pagination, API endpoints
//! - [`output`] - Decimal formatting, row tagging, compressed sinks, file layout
//! - [`calendar`] - Weekday enumeration for date ranges
//! - [`exclusions`] - Static ticker exclusion list
//! - [`cli`] - Command line interface

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Weekday enumeration for backfill ranges
pub mod calendar;

/// CLI command implementations
pub mod cli;

/// Download orchestration
pub mod downloader;

/// Static ticker exclusion list
pub mod exclusions;

/// Data fetchers
pub mod fetcher;

/// Metrics registration and exporter
pub mod metrics;

/// Data output writers
pub mod output;

/// Columns of the daily tickers file, in output order
pub const TICKER_DETAIL_COLUMNS: [&str; 23] = [
    "ticker",
    "name",
    "primary_exchange",
    "type",
    "composite_figi",
    "share_class_figi",
    "delisted_utc",
    "city",
    "state",
    "country",
    "description",
    "sic_code",
    "sic_description",
    "ticker_root",
    "ticker_suffix",
    "homepage_url",
    "total_employees",
    "list_date",
    "share_class_shares_outstanding",
    "weighted_shares_outstanding",
    "is_test",
    "unit_of_trade",
    "round_lot",
];

/// Columns of the daily trades file, in output order
pub const TRADE_COLUMNS: [&str; 13] = [
    "ticker",
    "conditions",
    "correction",
    "exchange",
    "id",
    "participant_timestamp",
    "price",
    "sequence_number",
    "sip_timestamp",
    "size",
    "tape",
    "trf_id",
    "trf_timestamp",
];

/// Columns the trades endpoint returns (everything but the ticker tag)
pub fn trade_response_columns() -> &'static [&'static str] {
    &TRADE_COLUMNS[1..]
}

/// One ticker's summary from the grouped daily endpoint
///
/// Only the ticker is consumed; the bar fields are kept for logging and tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedDaily {
    /// Ticker symbol
    #[serde(rename = "T")]
    pub ticker: String,
    /// Volume
    #[serde(rename = "v", default)]
    pub volume: Option<Number>,
    /// Volume weighted average price
    #[serde(rename = "vw", default)]
    pub vwap: Option<Number>,
    /// Open price
    #[serde(rename = "o", default)]
    pub open: Option<Number>,
    /// Close price
    #[serde(rename = "c", default)]
    pub close: Option<Number>,
    /// High price
    #[serde(rename = "h", default)]
    pub high: Option<Number>,
    /// Low price
    #[serde(rename = "l", default)]
    pub low: Option<Number>,
    /// Bar start (Unix milliseconds)
    #[serde(rename = "t", default)]
    pub timestamp: Option<i64>,
    /// Number of trades
    #[serde(rename = "n", default)]
    pub transactions: Option<u64>,
}

/// Postal address nested in ticker details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    /// Street line 1
    #[serde(default)]
    pub address1: Option<String>,
    /// Street line 2
    #[serde(default)]
    pub address2: Option<String>,
    /// City
    #[serde(default)]
    pub city: Option<String>,
    /// State
    #[serde(default)]
    pub state: Option<String>,
    /// Postal code
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Reference data for one ticker as of one date
///
/// Every field is optional and unknown fields are ignored, so sparse or extended
/// payloads deserialize without error. A missing ticker deserializes as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerDetail {
    /// Ticker symbol
    #[serde(default)]
    pub ticker: String,
    /// Company or instrument name
    #[serde(default)]
    pub name: Option<String>,
    /// Primary listing exchange MIC
    #[serde(default)]
    pub primary_exchange: Option<String>,
    /// Instrument type code (CS, ETF, ...)
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Composite OpenFIGI
    #[serde(default)]
    pub composite_figi: Option<String>,
    /// Share class OpenFIGI
    #[serde(default)]
    pub share_class_figi: Option<String>,
    /// Delisting timestamp
    #[serde(default)]
    pub delisted_utc: Option<String>,
    /// Flat city field (older payloads)
    #[serde(default)]
    pub city: Option<String>,
    /// Flat state field (older payloads)
    #[serde(default)]
    pub state: Option<String>,
    /// Country
    #[serde(default)]
    pub country: Option<String>,
    /// Nested address (current payloads)
    #[serde(default)]
    pub address: Option<Address>,
    /// Business description
    #[serde(default)]
    pub description: Option<String>,
    /// SIC code
    #[serde(default)]
    pub sic_code: Option<String>,
    /// SIC description
    #[serde(default)]
    pub sic_description: Option<String>,
    /// Root of the ticker
    #[serde(default)]
    pub ticker_root: Option<String>,
    /// Suffix of the ticker
    #[serde(default)]
    pub ticker_suffix: Option<String>,
    /// Company website
    #[serde(default)]
    pub homepage_url: Option<String>,
    /// Employee count
    #[serde(default)]
    pub total_employees: Option<Number>,
    /// First listing date
    #[serde(default)]
    pub list_date: Option<String>,
    /// Shares outstanding for the share class
    #[serde(default)]
    pub share_class_shares_outstanding: Option<Number>,
    /// Weighted shares outstanding
    #[serde(default)]
    pub weighted_shares_outstanding: Option<Number>,
    /// Whether the ticker is a test instrument
    #[serde(default)]
    pub is_test: Option<bool>,
    /// Shares per unit of trade
    #[serde(default)]
    pub unit_of_trade: Option<Number>,
    /// Round lot size
    #[serde(default)]
    pub round_lot: Option<Number>,
}

/// A single column value of a ticker detail row
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    /// Absent field, rendered empty
    Missing,
    /// Text field
    Text(&'a str),
    /// Numeric field, rendered as a plain decimal
    Number(&'a Number),
    /// Boolean field
    Bool(bool),
}

impl TickerDetail {
    /// Placeholder detail for a ticker the API has no record of
    pub fn unknown(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Self::default()
        }
    }

    /// Whether this ticker is flagged as test data
    pub fn is_test(&self) -> bool {
        self.is_test.unwrap_or(false)
    }

    /// Value of one of [`TICKER_DETAIL_COLUMNS`]
    ///
    /// City and state fall back to the nested address when the flat fields are
    /// absent.
    pub fn field(&self, column: &str) -> FieldValue<'_> {
        fn text(value: &Option<String>) -> FieldValue<'_> {
            value.as_deref().map_or(FieldValue::Missing, FieldValue::Text)
        }
        fn number(value: &Option<Number>) -> FieldValue<'_> {
            value.as_ref().map_or(FieldValue::Missing, FieldValue::Number)
        }
        let address = self.address.as_ref();

        match column {
            "ticker" => FieldValue::Text(&self.ticker),
            "name" => text(&self.name),
            "primary_exchange" => text(&self.primary_exchange),
            "type" => text(&self.kind),
            "composite_figi" => text(&self.composite_figi),
            "share_class_figi" => text(&self.share_class_figi),
            "delisted_utc" => text(&self.delisted_utc),
            "city" => match text(&self.city) {
                FieldValue::Missing => address.map_or(FieldValue::Missing, |a| text(&a.city)),
                value => value,
            },
            "state" => match text(&self.state) {
                FieldValue::Missing => address.map_or(FieldValue::Missing, |a| text(&a.state)),
                value => value,
            },
            "country" => text(&self.country),
            "description" => text(&self.description),
            "sic_code" => text(&self.sic_code),
            "sic_description" => text(&self.sic_description),
            "ticker_root" => text(&self.ticker_root),
            "ticker_suffix" => text(&self.ticker_suffix),
            "homepage_url" => text(&self.homepage_url),
            "total_employees" => number(&self.total_employees),
            "list_date" => text(&self.list_date),
            "share_class_shares_outstanding" => number(&self.share_class_shares_outstanding),
            "weighted_shares_outstanding" => number(&self.weighted_shares_outstanding),
            "is_test" => self.is_test.map_or(FieldValue::Missing, FieldValue::Bool),
            "unit_of_trade" => number(&self.unit_of_trade),
            "round_lot" => number(&self.round_lot),
            _ => FieldValue::Missing,
        }
    }
}
