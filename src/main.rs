//! Main entry point for the polygon-backfill CLI

use clap::Parser;
use polygon_backfill::cli::Cli;
use polygon_backfill::downloader::ProgressReporter;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with optional JSON formatting and file output
///
/// Logs go to stderr, between redraws of the progress bars, unless a file is given.
/// `LOG_FORMAT=json` selects JSON lines; `RUST_LOG` overrides the default filter.
fn init_tracing(log_file: Option<&Path>, progress: &ProgressReporter) -> anyhow::Result<()> {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("polygon_backfill=info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match (log_file, json_format) {
        (Some(path), json) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("cannot open log file {}: {}", path.display(), e))?;
            let builder = builder.with_writer(Mutex::new(file)).with_ansi(false);
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
        }
        (None, true) => builder.with_writer(progress.log_writer()).json().init(),
        (None, false) => builder.with_writer(progress.log_writer()).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let progress = cli.progress();

    if let Err(e) = init_tracing(cli.log_file.as_deref(), &progress) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let result = cli.execute(progress).await.map_err(|e| anyhow::anyhow!(e));

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
