//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for page fetching, batch
//! application, and run outcomes through the `metrics` facade; the
//! surrounding process decides where they are shipped.
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `replicator_` and follow Prometheus
//! conventions: counters end in `_total`, gauges represent current state,
//! histograms track distributions (durations in seconds).

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record one page fetch attempt and its latency.
pub fn record_page_fetch(success: bool, duration: Duration) {
    let status = if success { "success" } else { "failure" };
    counter!("replicator_page_fetches_total", "status" => status).increment(1);
    histogram!("replicator_page_fetch_duration_seconds").record(duration.as_secs_f64());
}

/// Record a page that contributed zero records (fetch error or skip).
pub fn record_page_failed() {
    counter!("replicator_pages_failed_total").increment(1);
}

/// Record a successfully applied batch.
pub fn record_batch_applied(records: usize, duration: Duration) {
    counter!("replicator_batches_applied_total").increment(1);
    counter!("replicator_records_stored_total").increment(records as u64);
    histogram!("replicator_batch_apply_duration_seconds").record(duration.as_secs_f64());
}

/// Record a batch that failed to apply.
pub fn record_batch_failed() {
    counter!("replicator_batches_failed_total").increment(1);
}

/// Record the outcome of a full replication run.
pub fn record_run(fetched: usize, stored: usize, failed_pages: usize, duration: Duration) {
    counter!("replicator_runs_total").increment(1);
    gauge!("replicator_last_run_fetched").set(fetched as f64);
    gauge!("replicator_last_run_stored").set(stored as f64);
    gauge!("replicator_last_run_failed_pages").set(failed_pages as f64);
    histogram!("replicator_run_duration_seconds").record(duration.as_secs_f64());
}
