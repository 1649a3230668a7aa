//! Metrics module
//!
//! Prometheus counters for the relay, exposed on `GET /metrics`.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Encoder,
    Histogram, TextEncoder,
};

lazy_static! {
    // Upload metrics
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "relay_uploads_total",
        "Total number of uploads forwarded to storage",
        &["status"]
    ).unwrap();

    pub static ref UPLOAD_BYTES_TOTAL: Counter = register_counter!(
        "relay_upload_bytes_total",
        "Total bytes forwarded to storage"
    ).unwrap();

    pub static ref UPLOAD_DURATION: Histogram = register_histogram!(
        "relay_upload_duration_seconds",
        "Storage PUT duration in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    // Auth metrics
    pub static ref AUTH_ATTEMPTS: CounterVec = register_counter_vec!(
        "relay_auth_attempts_total",
        "Authentication attempts",
        &["status"]
    ).unwrap();

    // Error metrics
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "relay_errors_total",
        "Total errors",
        &["type"]
    ).unwrap();
}

/// Record a successful upload
pub fn record_upload_success(bytes: u64) {
    UPLOADS_TOTAL.with_label_values(&["success"]).inc();
    UPLOAD_BYTES_TOTAL.inc_by(bytes as f64);
}

/// Record a failed upload
pub fn record_upload_failure() {
    UPLOADS_TOTAL.with_label_values(&["failure"]).inc();
}

/// Record upload duration
pub fn record_upload_duration(duration_secs: f64) {
    UPLOAD_DURATION.observe(duration_secs);
}

/// Record authentication attempt
pub fn record_auth_attempt(success: bool) {
    let status = if success { "success" } else { "failure" };
    AUTH_ATTEMPTS.with_label_values(&[status]).inc();
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Render the default registry in the Prometheus text format
pub fn gather_text() -> String {
    // touch the lazy statics so they appear before the first event
    lazy_static::initialize(&UPLOADS_TOTAL);
    lazy_static::initialize(&UPLOAD_BYTES_TOTAL);
    lazy_static::initialize(&UPLOAD_DURATION);
    lazy_static::initialize(&AUTH_ATTEMPTS);
    lazy_static::initialize(&ERRORS_TOTAL);

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}
