//! Metrics collection and exposition.
//!
//! # Metrics
//! - `audito_requests_total` (counter): requests by endpoint, status
//! - `audito_request_duration_seconds` (histogram): latency by endpoint
//! - `audito_cache_lookups_total` (counter): hits and misses by namespace
//! - `audito_cache_entries` (gauge): entries currently stored
//! - `audito_rate_limited_total` (counter): denials by endpoint
//! - `audito_upstream_failures_total` (counter): failures by kind
//! - `audito_swept_total` (counter): entries reclaimed by each sweeper
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - The Prometheus exporter is only installed when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(endpoint: &str, status: u16, start: Instant) {
    counter!(
        "audito_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("audito_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(namespace: &str, hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!(
        "audito_cache_lookups_total",
        "namespace" => namespace.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_cache_size(size: usize) {
    gauge!("audito_cache_entries").set(size as f64);
}

pub fn record_rate_limited(endpoint: &str) {
    counter!("audito_rate_limited_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_upstream_failure(kind: &str) {
    counter!("audito_upstream_failures_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_swept(sweeper: &str, removed: usize) {
    counter!("audito_swept_total", "sweeper" => sweeper.to_string()).increment(removed as u64);
}
