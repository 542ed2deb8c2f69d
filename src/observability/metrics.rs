//! Prometheus metrics.
//!
//! The recorder is installed only for `watch --metrics-port`; elsewhere the
//! `metrics` macros are no-ops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::SkyntError;
use crate::source::Provenance;

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Service operations used as metric labels.
///
/// Anything else is bucketed as `"__unknown__"`.
const KNOWN_OPERATIONS: [&str; 7] = [
    "current_phi",
    "details",
    "token",
    "tokens",
    "rarity",
    "distribution",
    "particles",
];

/// Maps an operation name to a bounded label value.
#[must_use]
pub fn sanitize_operation_label(operation: &str) -> &str {
    if KNOWN_OPERATIONS.contains(&operation) {
        operation
    } else {
        "__unknown__"
    }
}

/// Installs the global recorder with an HTTP listener on `127.0.0.1:<port>`.
///
/// # Errors
///
/// Returns [`SkyntError::Io`] if the listener cannot be bound.
pub fn init_metrics(port: u16) -> Result<(), SkyntError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    PrometheusBuilder::new()
        .with_http_listener(([127, 0, 0, 1], port))
        .install()
        .map_err(|e| SkyntError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    tracing::info!(port, "serving Prometheus metrics");
    Ok(())
}

fn describe_metrics() {
    describe_gauge!("skynt_phi_total", "Most recent Φ total");
    describe_gauge!("skynt_phi_delta_total", "Most recent ΔS total");
    describe_gauge!("skynt_phi_history_len", "Readings held in history");
    describe_counter!("skynt_phi_readings_total", "Φ readings recorded, by source");
    describe_counter!(
        "skynt_phi_upstream_errors_total",
        "Upstream failures, by operation"
    );
    describe_counter!(
        "skynt_phi_fallbacks_total",
        "Operations answered by the mock fallback"
    );
    describe_histogram!(
        "skynt_phi_fetch_duration_ms",
        "Source fetch duration in milliseconds"
    );
}

/// Records a Φ reading.
#[allow(clippy::cast_precision_loss)]
pub fn record_reading(source: Provenance, total: f64, history_len: usize) {
    counter!("skynt_phi_readings_total", "source" => source.as_str()).increment(1);
    gauge!("skynt_phi_total").set(total);
    gauge!("skynt_phi_history_len").set(history_len as f64);
}

/// Sets the current `ΔS_total`.
pub fn set_delta_total(delta_total: f64) {
    gauge!("skynt_phi_delta_total").set(delta_total);
}

/// Records an upstream failure.
pub fn record_upstream_error(operation: &str) {
    let label = sanitize_operation_label(operation);
    counter!("skynt_phi_upstream_errors_total", "operation" => label.to_owned()).increment(1);
}

/// Records a mock fallback.
pub fn record_fallback(operation: &str) {
    let label = sanitize_operation_label(operation);
    counter!("skynt_phi_fallbacks_total", "operation" => label.to_owned()).increment(1);
}

/// Records how long a source fetch took.
pub fn record_fetch_duration(operation: &str, duration: Duration) {
    let label = sanitize_operation_label(operation);
    histogram!("skynt_phi_fetch_duration_ms", "operation" => label.to_owned())
        .record(duration.as_secs_f64() * 1000.0);
}
