//! Header and ticker detail row encoding
//!
//! Every line of the daily files ends with a comma after its last column, matching
//! the header layout. Text fields are quoted only when they contain a delimiter,
//! quote or line break, so a record never spans lines unquoted.

use bytes::Bytes;
use csv::{QuoteStyle, WriterBuilder};

use super::decimal::format_number;
use super::{OutputError, OutputResult};
use crate::{FieldValue, TickerDetail, TICKER_DETAIL_COLUMNS};

/// Header line: each column followed by a comma, then a newline
pub fn header_line(columns: &[&str]) -> String {
    let mut line: String = columns.iter().map(|c| format!("{c},")).collect();
    line.push('\n');
    line
}

/// Render one field as CSV text
fn render_field(value: FieldValue<'_>) -> String {
    match value {
        FieldValue::Missing => String::new(),
        FieldValue::Text(text) => text.to_string(),
        FieldValue::Number(number) => format_number(number),
        FieldValue::Bool(flag) => flag.to_string(),
    }
}

/// Encode a ticker detail as one complete row of the tickers file
pub fn encode_ticker_detail(detail: &TickerDetail) -> OutputResult<Bytes> {
    let fields: Vec<String> = TICKER_DETAIL_COLUMNS
        .iter()
        .map(|column| render_field(detail.field(column)))
        .chain(std::iter::once(String::new()))
        .collect();

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::with_capacity(256));
    writer
        .write_record(&fields)
        .map_err(|e| OutputError::CsvError(format!("Failed to encode {}: {}", detail.ticker, e)))?;
    let buffer = writer
        .into_inner()
        .map_err(|e| OutputError::CsvError(format!("Failed to flush row buffer: {e}")))?;

    Ok(Bytes::from(buffer))
}
