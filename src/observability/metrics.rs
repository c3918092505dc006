//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_forward_total` (counter): forwarding outcomes by outcome, status
//! - `proxy_upstream_duration_seconds` (histogram): upstream round-trip latency
//! - `proxy_backoff_registered_total` (counter): backoff windows opened by kind
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one `/raw` request.
pub fn record_forward(outcome: &'static str, status: u16) {
    metrics::counter!(
        "proxy_forward_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record how long the upstream took to answer (or fail).
pub fn record_upstream_latency(start: Instant) {
    metrics::histogram!("proxy_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_backoff(kind: &'static str) {
    metrics::counter!("proxy_backoff_registered_total", "kind" => kind).increment(1);
}
