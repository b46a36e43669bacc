//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, tunnels, errors)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_http_requests_total` (counter): requests by route, method, status
//! - `gateway_http_request_duration_seconds` (histogram): latency by route
//! - `gateway_upstream_errors_total` (counter): failed forwards by route
//! - `gateway_tunnels_opened_total` (counter): upgrade tunnels by route
//! - `gateway_tunnel_bytes_total` (counter): relayed bytes by route, direction
//!
//! # Design Decisions
//! - Labels for route, method, status code, relay direction
//! - The exporter is optional; recording without it installed is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::tunnel::RelayOutcome;

/// Install the Prometheus exporter, serving scrapes on `address`.
pub fn init_exporter(address: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()?;
    describe_metrics();
    tracing::info!(address = %address, "Prometheus exporter listening");
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "gateway_http_requests_total",
        "Requests handled, by route, method and status"
    );
    describe_histogram!(
        "gateway_http_request_duration_seconds",
        "Request handling latency by route"
    );
    describe_counter!(
        "gateway_upstream_errors_total",
        "Upstream forwarding failures by route"
    );
    describe_counter!(
        "gateway_tunnels_opened_total",
        "Upgrade tunnels opened by route"
    );
    describe_counter!(
        "gateway_tunnel_bytes_total",
        "Bytes relayed through tunnels, by route and direction"
    );
}

/// Record one handled HTTP request.
pub fn record_request(route: &str, method: &str, status: u16, started: Instant) {
    counter!(
        "gateway_http_requests_total",
        "route" => route.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_http_request_duration_seconds",
        "route" => route.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

/// Record a forwarding failure surfaced to the client as a 502.
pub fn record_upstream_error(route: &str) {
    counter!("gateway_upstream_errors_total", "route" => route.to_string()).increment(1);
}

/// Record a successfully opened upgrade tunnel.
pub fn record_tunnel_opened(route: &str) {
    counter!("gateway_tunnels_opened_total", "route" => route.to_string()).increment(1);
}

/// Record the byte totals of a finished tunnel.
pub fn record_tunnel_closed(route: &str, outcome: &RelayOutcome) {
    counter!(
        "gateway_tunnel_bytes_total",
        "route" => route.to_string(),
        "direction" => "client_to_upstream"
    )
    .increment(outcome.client_to_upstream);
    counter!(
        "gateway_tunnel_bytes_total",
        "route" => route.to_string(),
        "direction" => "upstream_to_client"
    )
    .increment(outcome.upstream_to_client);
}
