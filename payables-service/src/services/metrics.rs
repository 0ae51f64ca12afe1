//! Prometheus metrics for payables-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_counter, CounterVec, Encoder, IntCounter, TextEncoder,
};

/// Counter for created payment series by type.
pub static SERIES_CREATED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payables_series_created_total",
        "Total number of payment series created",
        &["series_type"]
    )
    .expect("Failed to register SERIES_CREATED")
});

/// Counter for series transitions by shape and outcome.
pub static SERIES_TRANSITIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payables_series_transitions_total",
        "Total number of payment series transitions",
        &["from", "to", "status"]
    )
    .expect("Failed to register SERIES_TRANSITIONS")
});

/// Counter for payments promoted from SCHEDULED to PENDING.
pub static PAYMENTS_PROMOTED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "payables_payments_promoted_total",
        "Total number of payments promoted to PENDING"
    )
    .expect("Failed to register PAYMENTS_PROMOTED")
});

/// Counter for errors.
pub static ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payables_errors_total",
        "Total number of errors",
        &["error_type"]
    )
    .expect("Failed to register ERRORS")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&SERIES_CREATED);
    Lazy::force(&SERIES_TRANSITIONS);
    Lazy::force(&PAYMENTS_PROMOTED);
    Lazy::force(&ERRORS);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).ok();
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_series_created(series_type: &str) {
    SERIES_CREATED.with_label_values(&[series_type]).inc();
}

pub fn record_transition(from: &str, to: &str, status: &str) {
    SERIES_TRANSITIONS
        .with_label_values(&[from, to, status])
        .inc();
}

pub fn record_promotions(count: u64) {
    PAYMENTS_PROMOTED.inc_by(count);
}

pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
