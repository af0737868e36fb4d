//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define request and entity metrics
//! - Expose a Prometheus-compatible scrape endpoint when enabled
//!
//! # Metrics
//! - `requests_sealed_total` (counter): requests handed to handlers
//! - `forwarded_chain_applied_total` (counter): forwarded chains trusted
//! - `forwarded_chain_rejected_total` (counter): chains ignored, by reason
//! - `entity_reuse_violations_total` (counter): second body obtain on a single-use entity
//! - `entity_body_limit_exceeded_total` (counter): bodies cut off at the caller's limit
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so library users
//!   pay nothing unless they opt in

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_request_sealed(method: &str) {
    counter!("requests_sealed_total", "method" => method.to_string()).increment(1);
}

pub fn record_forwarded_applied() {
    counter!("forwarded_chain_applied_total").increment(1);
}

pub fn record_forwarded_rejected(reason: &'static str) {
    counter!("forwarded_chain_rejected_total", "reason" => reason).increment(1);
}

pub fn record_reuse_violation() {
    counter!("entity_reuse_violations_total").increment(1);
}

pub fn record_body_limit_exceeded() {
    counter!("entity_body_limit_exceeded_total").increment(1);
}
