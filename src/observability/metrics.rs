//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_payments_total` (counter): payments by outcome (success, partial, failed, error)
//! - `relay_payment_duration_seconds` (histogram): end-to-end payment latency
//! - `relay_endpoint_probe_total` (counter): liveness probes by endpoint host and result
//! - `relay_broadcast_total` (counter): raw transaction submissions by leg and result
//! - `relay_http_requests_total` (counter): inbound requests by status code
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, which keeps tests free of setup
//! - Labels never carry addresses or URLs with paths

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_payment(outcome: &'static str, started: Instant) {
    metrics::counter!("relay_payments_total", "outcome" => outcome).increment(1);
    metrics::histogram!("relay_payment_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_endpoint_probe(endpoint: &str, healthy: bool) {
    let result = if healthy { "up" } else { "down" };
    metrics::counter!(
        "relay_endpoint_probe_total",
        "endpoint" => endpoint.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_broadcast(leg: &'static str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    metrics::counter!("relay_broadcast_total", "leg" => leg, "result" => result).increment(1);
}

pub fn record_http_request(status: u16) {
    metrics::counter!("relay_http_requests_total", "status" => status.to_string()).increment(1);
}
