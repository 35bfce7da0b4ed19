//! Metrics collection and exposition.
//!
//! # Metrics
//! - `header_rules_responses_total` (counter): responses the rules ran on
//! - `header_rules_rule_matches_total` (counter): matches per rule name
//! - `header_rules_apply_failures_total` (counter): responses sent unmodified after a fault
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

/// Record one decorated response and the rules that matched it.
pub fn record_matches(matched: &[&str]) {
    metrics::counter!("header_rules_responses_total").increment(1);
    for rule in matched {
        metrics::counter!("header_rules_rule_matches_total", "rule" => rule.to_string()).increment(1);
    }
}

pub fn record_apply_failure() {
    metrics::counter!("header_rules_apply_failures_total").increment(1);
}
