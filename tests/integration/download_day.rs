//! End-to-end day downloads against a scripted API

use crate::support::{config, read_zst, Reply, ScriptedTransport};
use chrono::NaiveDate;
use polygon_backfill::downloader::{DayDownloader, DownloadError};
use polygon_backfill::fetcher::polygon::PolygonClient;
use polygon_backfill::output::{OutputPaths, OutputSink, RecordSink};
use polygon_backfill::{trade_response_columns, TICKER_DETAIL_COLUMNS};
use bytes::Bytes;
use reqwest::StatusCode;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

const GROUPED: &str = "/v2/aggs/grouped/locale/us/market/stocks/2024-01-02";

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

fn detail_path(ticker: &str) -> String {
    format!("/v3/reference/tickers/{ticker}?date=2024-01-02")
}

fn trades_path(ticker: &str) -> String {
    format!("/v3/trades/{ticker}?timestamp=2024-01-02&limit=50000")
}

fn trades_header() -> String {
    trade_response_columns().join(",")
}

fn grouped(tickers: &[&str]) -> Reply {
    let results: Vec<_> = tickers
        .iter()
        .map(|t| {
            json!({"T": t, "v": 100, "o": 1.0, "c": 1.5, "h": 2, "l": 0.5, "t": 1704229200000i64})
        })
        .collect();
    Reply::json(json!({"status": "OK", "resultsCount": results.len(), "results": results}))
}

fn detail(ticker: &str, is_test: bool) -> Reply {
    Reply::json(json!({
        "status": "OK",
        "results": {"ticker": ticker, "name": format!("{ticker} Corp"), "is_test": is_test}
    }))
}

fn downloader(
    transport: Arc<ScriptedTransport>,
    dir: &TempDir,
    max_retries: u32,
    exclusions: &[&str],
) -> DayDownloader {
    let client = PolygonClient::with_transport(&config(max_retries), transport);
    DayDownloader::new(
        client,
        OutputPaths::new(dir.path()),
        exclusions.iter().map(|t| t.to_string()).collect::<HashSet<_>>(),
    )
    .with_concurrency(4)
}

fn body_lines(content: &str) -> Vec<&str> {
    content.lines().skip(1).collect()
}

#[tokio::test(start_paused = true)]
async fn test_test_ticker_excluded_from_details_and_trades() {
    let transport = ScriptedTransport::new();
    let trades = format!("{}\n1,0,4,t1,10,1.25,1,11,100,1,,\n", trades_header());
    transport
        .on(GROUPED, [grouped(&["B", "A", "A"])])
        .on(&detail_path("A"), [detail("A", false)])
        .on(&detail_path("B"), [detail("B", true)])
        .on(&trades_path("A"), [Reply::csv(&trades, None)]);
    let dir = TempDir::new().unwrap();
    let downloader = downloader(transport.clone(), &dir, 0, &[]);

    let report = downloader.day(date()).await.unwrap();

    assert_eq!(report.discovered, 2);
    assert_eq!(report.details_written, 1);
    assert_eq!(report.test_tickers, vec!["B".to_string()]);
    assert_eq!(report.trade_tickers, 1);
    assert_eq!(report.trade_rows, 1);
    assert_eq!(transport.count(&detail_path("A")), 1);
    assert_eq!(transport.count(&trades_path("B")), 0);

    let tickers = read_zst(&downloader.paths().tickers(date()));
    let lines: Vec<&str> = tickers.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], format!("{},", TICKER_DETAIL_COLUMNS.join(",")));
    assert!(lines[1].starts_with("A,A Corp,"));
    assert!(lines[1].contains(",false,"));

    let trades = read_zst(&downloader.paths().trades(date()));
    assert_eq!(body_lines(&trades), vec!["A,1,0,4,t1,10,1.25,1,11,100,1,,"]);
}

#[tokio::test(start_paused = true)]
async fn test_two_pages_each_with_header() {
    let transport = ScriptedTransport::new();
    let header = trades_header();
    let next = crate::support::url(&format!("{}&cursor=p2", trades_path("X")));
    transport
        .on(GROUPED, [grouped(&["X"])])
        .on(&detail_path("X"), [detail("X", false)])
        .on(
            &trades_path("X"),
            [Reply::csv(&format!("{header}\nr1\n"), Some(next))],
        )
        .on(
            &format!("{}&cursor=p2", trades_path("X")),
            [Reply::csv(&format!("{header}\nr2\n"), None)],
        );
    let dir = TempDir::new().unwrap();
    let downloader = downloader(transport, &dir, 0, &[]);

    let report = downloader.day(date()).await.unwrap();
    assert_eq!(report.trade_rows, 2);

    let trades = read_zst(&downloader.paths().trades(date()));
    let expected_header = format!("ticker,{header},\n");
    assert_eq!(trades, format!("{expected_header}X,r1\nX,r2\n"));
}

#[tokio::test(start_paused = true)]
async fn test_failing_detail_is_retried_then_excluded() {
    let transport = ScriptedTransport::new();
    transport
        .on(GROUPED, [grouped(&["F", "G"])])
        .on(&detail_path("F"), [Reply::status(StatusCode::BAD_GATEWAY)])
        .on(&detail_path("G"), [detail("G", false)])
        .on(&trades_path("G"), [Reply::csv(&format!("{}\ng1\n", trades_header()), None)]);
    let dir = TempDir::new().unwrap();
    let downloader = downloader(transport.clone(), &dir, 2, &[]);

    let report = downloader.day(date()).await.unwrap();

    assert_eq!(transport.count(&detail_path("F")), 3);
    assert_eq!(transport.count(&trades_path("F")), 0);
    assert_eq!(report.failed_details, vec!["F".to_string()]);
    assert_eq!(report.details_written, 1);
    assert_eq!(report.trade_tickers, 1);

    let tickers = read_zst(&downloader.paths().tickers(date()));
    assert!(body_lines(&tickers).iter().all(|line| line.starts_with("G,")));
}

#[tokio::test(start_paused = true)]
async fn test_failing_trades_are_excluded_and_day_completes() {
    let transport = ScriptedTransport::new();
    transport
        .on(GROUPED, [grouped(&["OK", "BAD"])])
        .on(&detail_path("OK"), [detail("OK", false)])
        .on(&detail_path("BAD"), [detail("BAD", false)])
        .on(&trades_path("OK"), [Reply::csv(&format!("{}\nok\n", trades_header()), None)])
        .on(&trades_path("BAD"), [Reply::NetworkError]);
    let dir = TempDir::new().unwrap();
    let downloader = downloader(transport.clone(), &dir, 1, &[]);

    let report = downloader.day(date()).await.unwrap();

    assert_eq!(report.failed_trades, vec!["BAD".to_string()]);
    assert_eq!(transport.count(&trades_path("BAD")), 2);
    assert_eq!(report.details_written, 2);
    let trades = read_zst(&downloader.paths().trades(date()));
    assert_eq!(body_lines(&trades), vec!["OK,ok"]);
}

#[tokio::test(start_paused = true)]
async fn test_excluded_and_unknown_tickers() {
    let transport = ScriptedTransport::new();
    transport
        .on(GROUPED, [grouped(&["SKIP", "NEW"])])
        .on(&trades_path("NEW"), [Reply::csv(&format!("{}\nn1\n", trades_header()), None)]);
    let dir = TempDir::new().unwrap();
    let downloader = downloader(transport.clone(), &dir, 0, &["SKIP"]);

    let report = downloader.day(date()).await.unwrap();

    assert_eq!(report.discovered, 1);
    assert_eq!(transport.count(&detail_path("SKIP")), 0);
    // Detail lookup answered 404: written as a bare row and still traded
    assert_eq!(transport.count(&detail_path("NEW")), 1);
    let tickers = read_zst(&downloader.paths().tickers(date()));
    assert_eq!(
        body_lines(&tickers),
        vec![format!("NEW{}", ",".repeat(TICKER_DETAIL_COLUMNS.len()))]
    );
    assert_eq!(report.trade_rows, 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_detail_recovers() {
    let transport = ScriptedTransport::new();
    transport
        .on(GROUPED, [grouped(&["R"])])
        .on(
            &detail_path("R"),
            [Reply::status(StatusCode::TOO_MANY_REQUESTS), detail("R", false)],
        );
    let dir = TempDir::new().unwrap();
    let downloader = downloader(transport.clone(), &dir, 3, &[]);

    let report = downloader.day(date()).await.unwrap();

    assert_eq!(transport.count(&detail_path("R")), 2);
    assert_eq!(report.details_written, 1);
    assert!(report.failed_details.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_discovery_removes_partial_output() {
    let transport = ScriptedTransport::new();
    transport.on(GROUPED, [Reply::status(StatusCode::INTERNAL_SERVER_ERROR)]);
    let dir = TempDir::new().unwrap();
    let downloader = downloader(transport.clone(), &dir, 1, &[]);

    let stale = downloader.paths().tickers(date());
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, b"stale").unwrap();

    let err = downloader.day(date()).await.unwrap_err();

    assert!(matches!(err, DownloadError::Fetch(_)));
    assert_eq!(transport.count(GROUPED), 2);
    assert!(!stale.exists());
    assert!(!downloader.paths().trades(date()).exists());
}

#[tokio::test(start_paused = true)]
async fn test_existing_day_is_skipped_unless_forced() {
    let transport = ScriptedTransport::new();
    transport.on(GROUPED, [grouped(&[])]);
    let dir = TempDir::new().unwrap();
    let downloader = downloader(transport.clone(), &dir, 0, &[]);

    assert!(downloader.day_unless_complete(date(), false).await.unwrap().is_some());
    assert!(downloader.day_unless_complete(date(), false).await.unwrap().is_none());
    assert_eq!(transport.count(GROUPED), 1);

    assert!(downloader.day_unless_complete(date(), true).await.unwrap().is_some());
    assert_eq!(transport.count(GROUPED), 2);
}

#[tokio::test(start_paused = true)]
async fn test_many_tickers_share_one_file_without_interleaving() {
    let tickers: Vec<String> = (0..20).map(|i| format!("T{i:02}")).collect();
    let names: Vec<&str> = tickers.iter().map(String::as_str).collect();
    let header = trades_header();

    let transport = ScriptedTransport::new();
    transport.on(GROUPED, [grouped(&names)]);
    for ticker in &tickers {
        transport.on(&detail_path(ticker), [detail(ticker, false)]);
        let rows: String = (0..50).map(|i| format!("{ticker}-{i},x\n")).collect();
        transport.on(&trades_path(ticker), [Reply::csv(&format!("{header}\n{rows}"), None)]);
    }
    let dir = TempDir::new().unwrap();
    let downloader = downloader(transport, &dir, 0, &[]).with_concurrency(8);

    let report = downloader.day(date()).await.unwrap();
    assert_eq!(report.trade_rows, 20 * 50);

    let trades = read_zst(&downloader.paths().trades(date()));
    let body = body_lines(&trades);
    assert_eq!(body.len(), 1000);
    for line in body {
        let (tag, rest) = line.split_once(',').unwrap();
        assert!(rest.starts_with(&format!("{tag}-")), "mixed line {line}");
        assert!(rest.ends_with(",x"));
    }
}

#[tokio::test(start_paused = true)]
async fn test_multiline_description_counts_as_one_detail() {
    let transport = ScriptedTransport::new();
    transport
        .on(GROUPED, [grouped(&["M"])])
        .on(
            &detail_path("M"),
            [Reply::json(json!({"results": {
                "ticker": "M",
                "description": "line one\nline two\nline three"
            }}))],
        )
        .on(&trades_path("M"), [Reply::csv(&format!("{}\nm1\n", trades_header()), None)]);
    let dir = TempDir::new().unwrap();
    let downloader = downloader(transport, &dir, 0, &[]);

    let report = downloader.day(date()).await.unwrap();

    assert_eq!(report.details_written, 1);
    assert_eq!(report.trade_tickers, 1);
    let tickers = read_zst(&downloader.paths().tickers(date()));
    assert!(tickers.contains("\"line one\nline two\nline three\""));
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_day_is_not_complete() {
    let transport = ScriptedTransport::new();
    transport.on(GROUPED, [grouped(&[])]);
    let dir = TempDir::new().unwrap();
    let downloader = downloader(transport.clone(), &dir, 0, &[]);

    // Both files opened and written, then abandoned before close
    for path in [downloader.paths().tickers(date()), downloader.paths().trades(date())] {
        let sink = OutputSink::create(&path, &["a"]).unwrap();
        sink.write_record(Bytes::from_static(b"1,\n"), 1).await.unwrap();
        drop(sink);
        assert!(!path.exists());
    }
    assert!(!downloader.paths().day_complete(date()));

    let report = downloader.day_unless_complete(date(), false).await.unwrap();
    assert!(report.is_some());
    assert_eq!(transport.count(GROUPED), 1);
    assert!(read_zst(&downloader.paths().trades(date())).starts_with("ticker,"));
}
