//! Metrics collection and exposition.
//!
//! # Metrics
//! - `devserver_requests_total` (counter): requests by method, status
//! - `devserver_request_duration_seconds` (histogram): latency distribution
//! - `devserver_reloads_total` (counter): external edits applied, by outcome
//! - `devserver_write_failures_total` (counter): failed write-backs
//! - `devserver_entries` (gauge): entries across all collections
//!
//! # Design Decisions
//! - Recording is always on; without an installed recorder the macros are
//!   no-ops
//! - The Prometheus endpoint is opt-in

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start_time: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!(
        "devserver_requests_total",
        "method" => method.clone(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "devserver_request_duration_seconds",
        "method" => method,
        "status" => status
    )
    .record(start_time.elapsed().as_secs_f64());
}

pub fn record_reload(outcome: &'static str) {
    metrics::counter!("devserver_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_write_failure() {
    metrics::counter!("devserver_write_failures_total").increment(1);
}

pub fn record_entries(count: usize) {
    metrics::gauge!("devserver_entries").set(count as f64);
}
