//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the supervisor.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the renderer supervisor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Heartbeat probe settings.
    pub heartbeat: HeartbeatConfig,

    /// Connection quality monitor settings.
    pub connection: ConnectionConfig,

    /// Recovery escalation settings.
    pub recovery: RecoveryConfig,

    /// Fallback screen settings.
    pub fallback: FallbackConfig,

    /// Message bridge settings.
    pub bridge: BridgeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Heartbeat probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Issue a probe on every foreground transition.
    pub enabled: bool,

    /// Acknowledgment window in milliseconds.
    pub ack_window_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ack_window_ms: 1200,
        }
    }
}

impl HeartbeatConfig {
    pub fn ack_window(&self) -> Duration {
        Duration::from_millis(self.ack_window_ms)
    }
}

/// Connection quality monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Loads slower than this are reported as slow.
    pub slow_threshold_ms: u64,

    /// Automatic error-screen timeout for the initial load.
    pub auto_error_timeout_ms: u64,

    /// Whether the automatic error-screen timeout starts enabled.
    pub show_error_on_timeout: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            slow_threshold_ms: 10_000,
            auto_error_timeout_ms: 5_000,
            show_error_on_timeout: true,
        }
    }
}

impl ConnectionConfig {
    pub fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_threshold_ms)
    }

    pub fn auto_error_timeout(&self) -> Duration {
        Duration::from_millis(self.auto_error_timeout_ms)
    }
}

/// Recovery escalation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Minimum time between accepted recovery actions in milliseconds.
    pub debounce_ms: u64,

    /// Soft attempts after which the controller escalates to a hard remount.
    pub escalation_threshold: u32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1500,
            escalation_threshold: 3,
        }
    }
}

impl RecoveryConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Fallback screen configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Stricter slow-load threshold used for screen transitions.
    pub slow_threshold_ms: u64,

    /// Backend endpoint probed by the manual retry action.
    pub reachability_url: String,

    /// Upper bound on a single reachability probe in milliseconds.
    pub reachability_timeout_ms: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            slow_threshold_ms: 5_000,
            reachability_url: "http://localhost:8080/health".to_string(),
            reachability_timeout_ms: 3_000,
        }
    }
}

impl FallbackConfig {
    pub fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_threshold_ms)
    }

    pub fn reachability_timeout(&self) -> Duration {
        Duration::from_millis(self.reachability_timeout_ms)
    }
}

/// Message bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Global function the renderer exposes to post messages to the host.
    pub post_function: String,

    /// Global function the host calls to deliver messages into the renderer.
    pub deliver_function: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            post_function: "window.hostBridge.postMessage".to_string(),
            deliver_function: "window.hostBridge.receive".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
