//! Daily file layout and skip-existing checks

use chrono::NaiveDate;
use polygon_backfill::output::{OutputPaths, RecordKind};
use std::path::PathBuf;
use tempfile::TempDir;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 11, 24).unwrap()
}

#[test]
fn test_kind_directories() {
    assert_eq!(RecordKind::Tickers.dir_name(), "tickers");
    assert_eq!(RecordKind::Trades.dir_name(), "trades");
}

#[test]
fn test_path_for_each_kind() {
    let paths = OutputPaths::new("/srv/polygon");
    assert_eq!(
        paths.path_for(RecordKind::Trades, date()),
        PathBuf::from("/srv/polygon/trades/2023-11-24.csv.zst")
    );
    assert_eq!(paths.tickers(date()), paths.path_for(RecordKind::Tickers, date()));
    assert_eq!(paths.root(), PathBuf::from("/srv/polygon").as_path());
}

#[test]
fn test_remove_day_leaves_other_dates() {
    let dir = TempDir::new().unwrap();
    let paths = OutputPaths::new(dir.path());
    let other = date().succ_opt().unwrap();

    for day in [date(), other] {
        for kind in RecordKind::ALL {
            let path = paths.path_for(kind, day);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"x").unwrap();
        }
    }

    paths.remove_day(date());

    assert!(!paths.day_complete(date()));
    assert!(paths.day_complete(other));
}
