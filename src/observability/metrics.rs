//! Metrics collection and exposition.
//!
//! # Metrics
//! - `user_service_requests_total` (counter): requests by method, route, status
//! - `user_service_request_duration_seconds` (histogram): latency distribution
//! - `user_service_retry_attempts_total` (counter): retried startup operations by outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exporter only runs when an address is configured

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a completed HTTP request.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let route = route.to_string();
    let status = status.to_string();

    counter!(
        "user_service_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status
    )
    .increment(1);
    histogram!(
        "user_service_request_duration_seconds",
        "method" => method,
        "route" => route
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record the outcome of one retry attempt.
pub fn record_retry_attempt(operation: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        "user_service_retry_attempts_total",
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
