//! Metrics collection and exposition.
//!
//! # Metrics
//! - `supervisor_recovery_actions_total` (counter): recovery actions by `action`
//! - `supervisor_recovery_debounced_total` (counter): dropped recovery requests
//! - `supervisor_heartbeat_failures_total` (counter): unacknowledged probes
//! - `supervisor_screen_transitions_total` (counter): transitions by target screen `to`
//! - `supervisor_renderer_command_errors_total` (counter): failed renderer commands by `command`
//! - `supervisor_load_duration_seconds` (histogram): renderer load latency
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_recovery_action(action: &'static str) {
    counter!("supervisor_recovery_actions_total", "action" => action).increment(1);
}

pub fn record_recovery_debounced() {
    counter!("supervisor_recovery_debounced_total").increment(1);
}

pub fn record_heartbeat_failure() {
    counter!("supervisor_heartbeat_failures_total").increment(1);
}

pub fn record_screen_transition(to: &'static str) {
    counter!("supervisor_screen_transitions_total", "to" => to).increment(1);
}

pub fn record_renderer_command_error(command: &'static str) {
    counter!("supervisor_renderer_command_errors_total", "command" => command).increment(1);
}

pub fn record_load_duration(elapsed: Duration) {
    histogram!("supervisor_load_duration_seconds").record(elapsed.as_secs_f64());
}
