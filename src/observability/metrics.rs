//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_attempts_total` (counter): attempts by relay and outcome
//! - `relay_fallbacks_total` (counter): switches to another relay
//! - `relay_rate_limited_total` (counter): upstream rate-limit waits
//! - `relay_health` (gauge): 1=healthy, 0=unhealthy
//! - `relay_server_responses_total` (counter): edge relay responses by status

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_attempt(relay: &str, outcome: &'static str) {
    counter!("relay_attempts_total", "relay" => relay.to_string(), "outcome" => outcome).increment(1);
}

pub fn record_fallback(from_relay: &str) {
    counter!("relay_fallbacks_total", "from" => from_relay.to_string()).increment(1);
}

pub fn record_rate_limited() {
    counter!("relay_rate_limited_total").increment(1);
}

pub fn record_relay_health(relay: &str, healthy: bool) {
    gauge!("relay_health", "relay" => relay.to_string()).set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_server_response(status: u16) {
    counter!("relay_server_responses_total", "status" => status.to_string()).increment(1);
}
