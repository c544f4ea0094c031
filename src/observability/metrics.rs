//! Metrics collection and exposition.
//!
//! # Metrics
//! - `probe_runs_total` (counter): probe attempts by tag, outcome
//! - `probe_skipped_total` (counter): abstentions by tag
//! - `probe_duration_seconds` (histogram): attempt latency by tag
//! - `report_requests_total` (counter): report responses by status
//!
//! # Design Decisions
//! - Labels carry tags and outcome classes only
//! - Exporter is optional; recording without one is a no-op

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// One finished probe attempt. `outcome` is "success" or a `ProbeError::kind()`.
pub fn record_probe(tag: &str, outcome: &'static str, elapsed: Duration) {
    counter!("probe_runs_total", "tag" => tag.to_string(), "outcome" => outcome).increment(1);
    histogram!("probe_duration_seconds", "tag" => tag.to_string()).record(elapsed.as_secs_f64());
}

pub fn record_skipped(tag: &str) {
    counter!("probe_skipped_total", "tag" => tag.to_string()).increment(1);
}

pub fn record_report_request(status: u16) {
    counter!("report_requests_total", "status" => status.to_string()).increment(1);
}
