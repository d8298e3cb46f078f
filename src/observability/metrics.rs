//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mcp_sessions_opened_total` (counter)
//! - `mcp_sessions_closed_total` (counter)
//! - `mcp_sessions_active` (gauge)
//! - `mcp_session_lifetime_seconds` (histogram)
//! - `mcp_messages_routed_total` (counter, labels: outcome)
//! - `mcp_requests_total` (counter, labels: method, outcome)
//! - `figma_requests_total` (counter, labels: endpoint, status)
//! - `figma_request_duration_seconds` (histogram, labels: endpoint)
//! - `figma_retries_total` (counter, labels: endpoint)
//!
//! Recording is a no-op until a recorder is installed, so every call site
//! records unconditionally.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

pub const SESSIONS_OPENED_TOTAL: &str = "mcp_sessions_opened_total";
pub const SESSIONS_CLOSED_TOTAL: &str = "mcp_sessions_closed_total";
pub const SESSIONS_ACTIVE: &str = "mcp_sessions_active";
pub const SESSION_LIFETIME_SECONDS: &str = "mcp_session_lifetime_seconds";
pub const MESSAGES_ROUTED_TOTAL: &str = "mcp_messages_routed_total";
pub const REQUESTS_TOTAL: &str = "mcp_requests_total";
pub const FIGMA_REQUESTS_TOTAL: &str = "figma_requests_total";
pub const FIGMA_REQUEST_DURATION_SECONDS: &str = "figma_request_duration_seconds";
pub const FIGMA_RETRIES_TOTAL: &str = "figma_retries_total";

/// Install the global Prometheus recorder with its own scrape listener.
///
/// Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_session_opened(active: usize) {
    metrics::counter!(SESSIONS_OPENED_TOTAL).increment(1);
    metrics::gauge!(SESSIONS_ACTIVE).set(active as f64);
}

pub fn record_session_closed(active: usize, lifetime: Duration) {
    metrics::counter!(SESSIONS_CLOSED_TOTAL).increment(1);
    metrics::gauge!(SESSIONS_ACTIVE).set(active as f64);
    metrics::histogram!(SESSION_LIFETIME_SECONDS).record(lifetime.as_secs_f64());
}

/// `outcome` is one of `delivered`, `missing_id`, `empty_body`, `not_found`, `closed`.
pub fn record_message_routed(outcome: &'static str) {
    metrics::counter!(MESSAGES_ROUTED_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_request(method: &str, outcome: &'static str) {
    metrics::counter!(REQUESTS_TOTAL, "method" => method.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_figma_request(endpoint: &'static str, status: u16, elapsed: Duration) {
    metrics::counter!(FIGMA_REQUESTS_TOTAL, "endpoint" => endpoint, "status" => status.to_string())
        .increment(1);
    metrics::histogram!(FIGMA_REQUEST_DURATION_SECONDS, "endpoint" => endpoint)
        .record(elapsed.as_secs_f64());
}

pub fn record_figma_retry(endpoint: &'static str) {
    metrics::counter!(FIGMA_RETRIES_TOTAL, "endpoint" => endpoint).increment(1);
}
