//! Metrics collection and exposition.
//!
//! # Metrics
//! - `site_requests_total` (counter): requests by outcome and status
//! - `site_request_duration_seconds` (histogram): latency by outcome
//! - `site_routes` (gauge): number of compiled page routes
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Outcome labels come from `Resolution::outcome`, a small fixed set

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

/// Record one handled request.
pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "site_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("site_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Publish the size of the compiled route table.
pub fn record_route_count(count: usize) {
    metrics::gauge!("site_routes").set(count as f64);
}
