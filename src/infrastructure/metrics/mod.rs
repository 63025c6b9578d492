//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Transaction outcomes (committed, rolled back, aborted)
//! - Database query duration histograms
//! - Pagination requests by mode

use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

const NAMESPACE: &str = "crud_core";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Finalized transactions by outcome
pub static TRANSACTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("transactions_total", "Total number of finalized transactions")
            .namespace(NAMESPACE),
        &["outcome"], // "committed", "rolled_back", "aborted"
    )
    .expect("Failed to create TRANSACTIONS_TOTAL metric")
});

/// Database query duration histogram
pub static DB_QUERY_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];
    HistogramVec::new(
        HistogramOpts::new(
            "db_query_duration_seconds",
            "Database query latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["operation", "table"],
    )
    .expect("Failed to create DB_QUERY_DURATION_SECONDS metric")
});

/// Paginated listings served, by mode
pub static PAGINATION_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pagination_requests_total", "Total number of paginated listings")
            .namespace(NAMESPACE),
        &["mode"], // "cursor", "offset"
    )
    .expect("Failed to create PAGINATION_REQUESTS_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(TRANSACTIONS_TOTAL.clone()))
        .expect("Failed to register TRANSACTIONS_TOTAL");
    registry
        .register(Box::new(DB_QUERY_DURATION_SECONDS.clone()))
        .expect("Failed to register DB_QUERY_DURATION_SECONDS");
    registry
        .register(Box::new(PAGINATION_REQUESTS_TOTAL.clone()))
        .expect("Failed to register PAGINATION_REQUESTS_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record a finalized transaction
pub fn record_transaction(outcome: &str) {
    TRANSACTIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Helper to record database query metrics
pub fn record_db_query(operation: &str, table: &str, duration_secs: f64) {
    DB_QUERY_DURATION_SECONDS
        .with_label_values(&[operation, table])
        .observe(duration_secs);
}

/// Helper to record a served page
pub fn record_pagination(mode: &str) {
    PAGINATION_REQUESTS_TOTAL.with_label_values(&[mode]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_are_exported() {
        record_transaction("committed");
        record_db_query("find", "posts", 0.002);
        record_pagination("cursor");

        let output = gather_metrics();
        assert!(output.contains("crud_core_transactions_total"));
        assert!(output.contains("crud_core_db_query_duration_seconds"));
        assert!(output.contains("crud_core_pagination_requests_total"));
    }
}
