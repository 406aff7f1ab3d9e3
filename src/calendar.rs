//! Weekday enumeration for backfill ranges
//!
//! Market holidays are not modeled; a holiday yields an empty discovery and
//! header-only files.

use chrono::{Datelike, NaiveDate, Weekday};

/// Range errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CalendarError {
    /// The range ends before it starts
    #[error("range end {to} is before start {from}")]
    InvertedRange {
        /// First date
        from: NaiveDate,
        /// Last date
        to: NaiveDate,
    },
}

/// Every Monday to Friday date in `[from, to]`, ascending
///
/// ```
/// use chrono::NaiveDate;
/// use polygon_backfill::calendar::weekdays;
///
/// // Friday to Monday
/// let from = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
/// let to = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
/// let days = weekdays(from, to).unwrap();
/// assert_eq!(days, vec![from, to]);
/// ```
pub fn weekdays(from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>, CalendarError> {
    if to < from {
        return Err(CalendarError::InvertedRange { from, to });
    }
    Ok(from
        .iter_days()
        .take_while(|date| *date <= to)
        .filter(|date| !matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
        .collect())
}
