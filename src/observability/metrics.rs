//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_choose_total` (counter): successful selections by service, endpoint
//! - `lb_no_endpoint_total` (counter): empty eligible subsets by service
//! - `lb_refresh_total` (counter): server list refreshes by service, result
//! - `lb_endpoint_up` (gauge): 1=up/unknown, 0=down
//! - `lb_endpoint_latency_seconds` (histogram): reported request latency
//! - `lb_task_failures_total` (counter): refresh/probe tasks that died
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape listener.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus exporter"),
    }
}

pub fn record_choice(service: &str, endpoint: &str) {
    metrics::counter!(
        "lb_choose_total",
        "service" => service.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}

pub fn record_no_endpoint(service: &str) {
    metrics::counter!("lb_no_endpoint_total", "service" => service.to_string()).increment(1);
}

pub fn record_refresh(service: &str, result: &'static str) {
    metrics::counter!(
        "lb_refresh_total",
        "service" => service.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_endpoint_health(service: &str, endpoint: &str, up: bool) {
    metrics::gauge!(
        "lb_endpoint_up",
        "service" => service.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .set(if up { 1.0 } else { 0.0 });
}

pub fn record_task_failure(service: &str) {
    metrics::counter!("lb_task_failures_total", "service" => service.to_string()).increment(1);
}

pub fn record_latency(service: &str, latency: Duration) {
    metrics::histogram!("lb_endpoint_latency_seconds", "service" => service.to_string())
        .record(latency.as_secs_f64());
}
