//! Metrics collection and exposition.
//!
//! # Metrics
//! - `health_probes_total` (counter): probes by backend, result
//! - `health_server_transitions_total` (counter): enable/disable by backend
//! - `health_disabled_servers` (gauge): servers currently disabled
//! - `health_pass_duration_seconds` (histogram): reconciliation pass latency
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder with an HTTP scrape endpoint.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_probe(backend: &str, healthy: bool) {
    let result = if healthy { "healthy" } else { "unhealthy" };
    counter!("health_probes_total", "backend" => backend.to_string(), "result" => result).increment(1);
}

/// `direction` is "enabled" or "disabled".
pub fn record_transition(backend: &str, direction: &'static str) {
    counter!(
        "health_server_transitions_total",
        "backend" => backend.to_string(),
        "direction" => direction
    )
    .increment(1);
}

pub fn record_pass(backend: &str, disabled: usize, started: Instant) {
    gauge!("health_disabled_servers", "backend" => backend.to_string()).set(disabled as f64);
    histogram!("health_pass_duration_seconds", "backend" => backend.to_string())
        .record(started.elapsed().as_secs_f64());
}
