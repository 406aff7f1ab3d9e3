//! Startup failures of the binary, before any request is made

use assert_cmd::Command;
use tempfile::TempDir;

fn command(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("polygon-backfill").unwrap();
    cmd.env_remove("POLYGON_KEY")
        .env("RUST_LOG", "polygon_backfill=info")
        .arg("--data-dir")
        .arg(dir.path())
        .arg("--no-progress")
        .arg("--base-url")
        .arg("http://127.0.0.1:9");
    cmd
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_lists_commands() {
    let output = Command::cargo_bin("polygon-backfill")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("backfill"));
    assert!(stdout.contains("day"));
}

#[test]
fn test_missing_api_key_fails() {
    let dir = TempDir::new().unwrap();
    let output = command(&dir)
        .args(["day", "--date", "2024-01-02"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("missing API key"));
    assert!(!dir.path().join("tickers").exists());
}

#[test]
fn test_missing_exclusion_file_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("no-such-list.txt");
    let output = command(&dir)
        .args(["day", "--date", "2024-01-02", "--api-key", "k", "--exclude"])
        .arg(&missing)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("failed to read exclusion list"));
}

#[test]
fn test_inverted_range_fails() {
    let dir = TempDir::new().unwrap();
    let output = command(&dir)
        .args([
            "backfill",
            "--from",
            "2024-02-01",
            "--to",
            "2024-01-01",
            "--api-key",
            "k",
        ])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("is before start"));
}

#[test]
fn test_invalid_concurrency_rejected_by_parser() {
    let dir = TempDir::new().unwrap();
    command(&dir)
        .args(["day", "--date", "2024-01-02", "--concurrency", "0"])
        .assert()
        .failure();
}

#[test]
fn test_complete_day_is_skipped_without_requests() {
    let dir = TempDir::new().unwrap();
    for kind in ["tickers", "trades"] {
        std::fs::create_dir_all(dir.path().join(kind)).unwrap();
        std::fs::write(dir.path().join(kind).join("2024-01-02.csv.zst"), b"").unwrap();
    }

    let output = command(&dir)
        .args(["day", "--date", "2024-01-02", "--api-key", "k"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", stderr_of(&output));
    assert!(stderr_of(&output).contains("Skipping 2024-01-02"));
}
