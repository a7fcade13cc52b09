//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Refresh cycles**: Counts and durations of poll cycles by outcome
//! - **Ledger queries**: View call outcomes per query side
//! - **Retries**: View calls retried after transient failures
//! - **Net rate**: The most recently published net rate
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the HTTP server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if called more than once or if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Refresh cycle counters
    describe_counter!(
        "stream_monitor_refresh_cycles_total",
        "Total refresh cycles by outcome"
    );
    describe_counter!(
        "stream_monitor_ledger_queries_total",
        "Total view function calls by side and outcome"
    );
    describe_counter!(
        "stream_monitor_view_retries_total",
        "Total view calls retried after transient failures"
    );

    // Rate gauge
    describe_gauge!(
        "stream_monitor_net_rate_per_second",
        "Most recently published net rate in tokens per second"
    );

    // Latency histograms
    describe_histogram!(
        "stream_monitor_ledger_query_seconds",
        "View call latency per query side"
    );
    describe_histogram!(
        "stream_monitor_refresh_cycle_seconds",
        "Time to run one refresh cycle including both view calls"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a completed refresh cycle.
pub fn record_refresh_cycle(outcome: &str) {
    counter!(
        "stream_monitor_refresh_cycles_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record one view function call.
pub fn record_ledger_query(side: &str, outcome: &str) {
    counter!(
        "stream_monitor_ledger_queries_total",
        "side" => side.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a view call retry after a transient failure.
pub fn record_view_retry(function: &str) {
    counter!(
        "stream_monitor_view_retries_total",
        "function" => function.to_string()
    )
    .increment(1);
}

/// Update the published net rate gauge.
pub fn set_net_rate(rate_per_second: f64) {
    gauge!("stream_monitor_net_rate_per_second").set(rate_per_second);
}

/// Record one view call's latency.
pub fn record_query_duration(side: &str, duration: Duration) {
    histogram!(
        "stream_monitor_ledger_query_seconds",
        "side" => side.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record refresh cycle duration.
pub fn record_refresh_duration(duration: Duration) {
    histogram!("stream_monitor_refresh_cycle_seconds").record(duration.as_secs_f64());
}
