//! Pipeline metrics.
//!
//! - Submission counters by kind and verdict
//! - Transcode outcome counter and duration histogram
//! - Download counters and byte totals

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::error::{WorkerError, WorkerResult};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("Prometheus exporter: {}", e)))
}

/// Metric name constants for consistency.
pub mod names {
    /// Submitted artifacts by source and verdict.
    pub const ARTIFACTS_TOTAL: &str = "subburn_artifacts_total";

    /// Finished transcodes by outcome.
    pub const TRANSCODES_TOTAL: &str = "subburn_transcodes_total";

    /// Wall time of a transcode run in seconds, downloads included.
    pub const TRANSCODE_DURATION_SECONDS: &str = "subburn_transcode_duration_seconds";

    /// Downloads by slot and status.
    pub const DOWNLOADS_TOTAL: &str = "subburn_downloads_total";

    /// Bytes written to disk by downloads.
    pub const DOWNLOAD_BYTES_TOTAL: &str = "subburn_download_bytes_total";
}

/// Record one submission verdict.
pub fn record_artifact(source: &str, verdict: &str) {
    counter!(
        names::ARTIFACTS_TOTAL,
        "source" => source.to_string(),
        "verdict" => verdict.to_string()
    )
    .increment(1);
}

/// Record a finished transcode.
pub fn record_transcode(outcome: &str, duration_secs: f64) {
    counter!(
        names::TRANSCODES_TOTAL,
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        names::TRANSCODE_DURATION_SECONDS,
        "outcome" => outcome.to_string()
    )
    .record(duration_secs);
}

/// Record a download attempt.
pub fn record_download(slot: &str, bytes: Option<u64>) {
    let status = if bytes.is_some() { "ok" } else { "error" };

    counter!(
        names::DOWNLOADS_TOTAL,
        "slot" => slot.to_string(),
        "status" => status
    )
    .increment(1);

    if let Some(bytes) = bytes {
        counter!(
            names::DOWNLOAD_BYTES_TOTAL,
            "slot" => slot.to_string()
        )
        .increment(bytes);
    }
}
