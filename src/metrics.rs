//! Metrics for long backfills
//!
//! Counters and histograms are recorded with the `metrics` macros at the point
//! of the event (requests, retries, 429s, limiter waits, rows written, days
//! finished). Without an installed recorder they are no-ops. [`init_metrics`]
//! installs a Prometheus exporter serving them over HTTP.

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Metrics setup errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// The exporter could not be installed or bound
    #[error("failed to install Prometheus exporter on {addr}: {reason}")]
    Exporter {
        /// Requested listen address
        addr: SocketAddr,
        /// Underlying failure
        reason: String,
    },
}

/// Install the Prometheus exporter and describe every metric
///
/// Must be called from within a tokio runtime. Repeated calls are no-ops.
///
/// # Arguments
/// * `addr` - Listen address of the scrape endpoint (e.g. `127.0.0.1:9090`)
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        METRICS_INITIALIZED.store(false, Ordering::SeqCst);
        return Err(MetricsError::Exporter {
            addr,
            reason: e.to_string(),
        });
    }
    describe_metrics();

    info!("Serving metrics on http://{}/metrics", addr);
    Ok(())
}

/// Whether [`init_metrics`] succeeded
pub fn is_initialized() -> bool {
    METRICS_INITIALIZED.load(Ordering::SeqCst)
}

/// Register descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Request attempts sent to the Polygon API"
    );
    describe_counter!(
        "http_429_errors_total",
        Unit::Count,
        "Attempts rejected with 429 Too Many Requests"
    );
    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Failed attempts followed by a retry"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "Duration of completed request attempts"
    );
    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Backoff waited before a retry"
    );
    describe_counter!(
        "rate_limit_waits_total",
        Unit::Count,
        "Acquisitions that waited for the next rate window"
    );
    describe_counter!(
        "rate_limit_drains_total",
        Unit::Count,
        "Rate budget drains forced by 429 responses"
    );
    describe_counter!(
        "output_rows_written_total",
        Unit::Count,
        "Rows written to compressed output files"
    );
    describe_counter!(
        "ticker_failures_total",
        Unit::Count,
        "Ticker tasks excluded after failing, by stage"
    );
    describe_counter!(
        "days_completed_total",
        Unit::Count,
        "Days written completely"
    );
    describe_counter!(
        "days_failed_total",
        Unit::Count,
        "Days aborted by a discovery or output failure"
    );
}
