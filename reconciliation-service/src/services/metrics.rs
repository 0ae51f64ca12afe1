//! Prometheus metrics for reconciliation-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_counter, CounterVec, Encoder, IntCounter, TextEncoder,
};

/// Counter for statement sync runs by outcome.
pub static STATEMENT_SYNCS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "reconciliation_statement_syncs_total",
        "Total number of statement sync runs",
        &["status"]
    )
    .expect("Failed to register STATEMENT_SYNCS")
});

/// Counter for statements inserted after dedupe.
pub static STATEMENTS_RECORDED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "reconciliation_statements_recorded_total",
        "Total number of statements recorded after deduplication"
    )
    .expect("Failed to register STATEMENTS_RECORDED")
});

/// Counter for reconciliation commits by outcome.
pub static COMMITS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "reconciliation_commits_total",
        "Total number of reconciliation commits",
        &["status"]
    )
    .expect("Failed to register COMMITS")
});

/// Counter for receivable operations.
pub static RECEIVABLE_OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "reconciliation_receivable_operations_total",
        "Total number of receivable operations",
        &["operation", "status"]
    )
    .expect("Failed to register RECEIVABLE_OPERATIONS")
});

/// Counter for errors.
pub static ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "reconciliation_errors_total",
        "Total number of errors",
        &["error_type"]
    )
    .expect("Failed to register ERRORS")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&STATEMENT_SYNCS);
    Lazy::force(&STATEMENTS_RECORDED);
    Lazy::force(&COMMITS);
    Lazy::force(&RECEIVABLE_OPERATIONS);
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

pub fn record_sync(status: &str, inserted: u64) {
    STATEMENT_SYNCS.with_label_values(&[status]).inc();
    STATEMENTS_RECORDED.inc_by(inserted);
}

pub fn record_commit(status: &str) {
    COMMITS.with_label_values(&[status]).inc();
}

pub fn record_receivable_operation(operation: &str, status: &str) {
    RECEIVABLE_OPERATIONS
        .with_label_values(&[operation, status])
        .inc();
}

pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
