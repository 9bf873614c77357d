//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_connections_accepted_total` (counter)
//! - `proxy_active_connections` (gauge)
//! - `proxy_route_failures_total` (counter): by `reason`
//! - `proxy_dial_failures_total` (counter)
//! - `proxy_relayed_bytes_total` (counter): by `direction`
//! - `proxy_connection_duration_seconds` (histogram)
//!
//! Recording is a no-op until [`init_metrics`] installs an exporter.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::relay::RelayStats;

/// Install the Prometheus exporter and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_accepted() {
    ::metrics::counter!("proxy_connections_accepted_total").increment(1);
}

pub fn set_active_connections(active: u64) {
    ::metrics::gauge!("proxy_active_connections").set(active as f64);
}

pub fn record_route_failure(reason: &'static str) {
    ::metrics::counter!("proxy_route_failures_total", "reason" => reason).increment(1);
}

pub fn record_dial_failure() {
    ::metrics::counter!("proxy_dial_failures_total").increment(1);
}

pub fn record_relayed(stats: &RelayStats) {
    ::metrics::counter!("proxy_relayed_bytes_total", "direction" => "to_backend")
        .increment(stats.to_backend);
    ::metrics::counter!("proxy_relayed_bytes_total", "direction" => "to_client")
        .increment(stats.to_client);
}

pub fn record_connection_duration(elapsed: Duration) {
    ::metrics::histogram!("proxy_connection_duration_seconds").record(elapsed.as_secs_f64());
}
