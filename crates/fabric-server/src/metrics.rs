// Metrics for the dataset executor service and the transaction manager
// Recorded through the `metrics` facade; the embedding process installs the exporter

use std::time::Instant;

use fabric_tx::TransactionStats;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Initialize all metric descriptions
/// Should be called once at application startup
pub fn init_metrics() {
    // Admin request metrics
    describe_counter!(
        "dataset_admin_requests_total",
        "Total number of dataset admin requests"
    );
    describe_histogram!(
        "dataset_admin_request_duration_seconds",
        "Dataset admin request duration in seconds"
    );

    // Transaction executor metrics
    describe_counter!(
        "transactions_committed_total",
        "Total number of committed transactions"
    );
    describe_counter!(
        "transactions_conflicts_total",
        "Total number of transactions rejected by conflict detection"
    );
    describe_counter!(
        "transactions_aborted_total",
        "Total number of aborted transactions"
    );

    // Transaction manager metrics
    describe_gauge!(
        "transactions_in_progress",
        "Number of transactions currently in progress"
    );
    describe_gauge!("transactions_invalid", "Number of invalidated transactions");
    describe_gauge!(
        "transactions_committed_change_sets",
        "Number of committed change-sets retained for conflict detection"
    );

    tracing::info!("Metrics initialized");
}

/// Record one admin request
pub fn record_admin_request(op: &str, status: u16, duration_secs: f64) {
    counter!("dataset_admin_requests_total", "op" => op.to_string(), "status" => status.to_string()).increment(1);
    histogram!("dataset_admin_request_duration_seconds", "op" => op.to_string()).record(duration_secs);
}

/// Publish transaction manager state
pub fn set_transaction_stats(stats: &TransactionStats) {
    gauge!("transactions_in_progress").set(stats.in_progress as f64);
    gauge!("transactions_invalid").set(stats.invalid as f64);
    gauge!("transactions_committed_change_sets").set(stats.committed_change_sets as f64);
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
