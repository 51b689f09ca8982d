//! Metrics collection and exposition.
//!
//! # Metrics
//! - `asset_proxy_requests_total` (counter): requests by response status
//! - `asset_proxy_request_duration_seconds` (histogram): time to response head
//! - `asset_proxy_rejections_total` (counter): failed requests by reason
//! - `asset_proxy_blocked_hosts_total` (counter): block-list refusals
//! - `asset_proxy_bytes_relayed_total` (counter): body bytes sent to callers
//!
//! Recording is a no-op until a recorder is installed, so the proxy runs
//! the same with metrics disabled.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(status: u16, start: Instant) {
    metrics::counter!("asset_proxy_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("asset_proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rejection(kind: &'static str) {
    metrics::counter!("asset_proxy_rejections_total", "reason" => kind).increment(1);
}

pub fn record_blocked_host() {
    metrics::counter!("asset_proxy_blocked_hosts_total").increment(1);
}

pub fn record_bytes_relayed(bytes: usize) {
    metrics::counter!("asset_proxy_bytes_relayed_total").increment(bytes as u64);
}
