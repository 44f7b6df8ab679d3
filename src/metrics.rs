/// Metrics and telemetry for BlackIce
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Fingerprint derivations by algorithm and outcome
/// - Scan outcomes and allow-list sizes
/// - Inventory gateway calls and latencies

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, Encoder, Histogram,
    HistogramVec, IntCounterVec, TextEncoder,
};

lazy_static! {
    // ========== Fingerprint Metrics ==========

    /// Fingerprint derivations by key algorithm and outcome
    pub static ref FINGERPRINT_DERIVATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "fingerprint_derivations_total",
        "Total number of fingerprint derivations",
        &["algorithm", "outcome"]
    )
    .unwrap();

    // ========== Scan Metrics ==========

    /// Scans by outcome (allowed, denied, invalid_key, gateway_error, error)
    pub static ref SCANS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "scans_total",
        "Total number of identity scans",
        &["outcome"]
    )
    .unwrap();

    /// Number of instances returned by successful scans
    pub static ref SCAN_ALLOWED_INSTANCES: Histogram = register_histogram!(
        "scan_allowed_instances",
        "Instances in the allow-list of a successful scan",
        vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0]
    )
    .unwrap();

    // ========== Gateway Metrics ==========

    /// Gateway calls by backend, operation and status
    pub static ref GATEWAY_CALLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gateway_calls_total",
        "Total number of inventory gateway calls",
        &["gateway", "operation", "status"]
    )
    .unwrap();

    /// Gateway call duration in seconds
    pub static ref GATEWAY_CALL_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "gateway_call_duration_seconds",
        "Inventory gateway call latencies in seconds",
        &["gateway", "operation"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();
}

/// Render all registered metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a fingerprint derivation outcome ("ok" or an error code)
///
/// `algorithm` is "unknown" when the key could not be parsed.
pub fn record_fingerprint(algorithm: &str, outcome: &str) {
    FINGERPRINT_DERIVATIONS_TOTAL
        .with_label_values(&[algorithm, outcome])
        .inc();
}

/// Record a scan outcome
pub fn record_scan(outcome: &str, allowed_instances: Option<usize>) {
    SCANS_TOTAL.with_label_values(&[outcome]).inc();
    if let Some(count) = allowed_instances {
        SCAN_ALLOWED_INSTANCES.observe(count as f64);
    }
}

/// Record an inventory gateway call
pub fn record_gateway_call(gateway: &str, operation: &str, success: bool, duration: f64) {
    let status = if success { "ok" } else { "error" };
    GATEWAY_CALLS_TOTAL
        .with_label_values(&[gateway, operation, status])
        .inc();
    GATEWAY_CALL_DURATION_SECONDS
        .with_label_values(&[gateway, operation])
        .observe(duration);
}
