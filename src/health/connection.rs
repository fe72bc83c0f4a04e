//! Connection quality monitor (passive load observation).
//!
//! # Responsibilities
//! - Track load start/end/error for the renderer's navigation lifecycle
//! - Classify loads as slow and errors as "server down"
//! - Own the single current ConnectionStatus and fan it out to listeners
//!
//! # Design Decisions
//! - Timers are not owned here: `on_load_start` returns the auto-error
//!   deadline and the supervisor arms it
//! - Listeners receive a shared reference to an immutable snapshot
//! - A failing or panicking listener is logged and skipped

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::config::ConnectionConfig;
use crate::health::status::{ConnectionStatus, LoadError};
use crate::observability::metrics;

/// Error returned by a status listener.
#[derive(Debug, Clone, Error)]
#[error("status listener failed: {0}")]
pub struct ListenerError(pub String);

/// Receives every published ConnectionStatus.
pub trait StatusListener: Send + Sync {
    fn on_status(&self, status: &ConnectionStatus) -> Result<(), ListenerError>;
}

impl<F> StatusListener for F
where
    F: Fn(&ConnectionStatus) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_status(&self, status: &ConnectionStatus) -> Result<(), ListenerError> {
        self(status)
    }
}

/// Identifies a registered listener for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Result of a completed load.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub status: ConnectionStatus,
    /// Whether the load belonged to the initial-load cycle.
    pub was_initial_load: bool,
}

/// Result of a failed load.
#[derive(Debug, Clone)]
pub struct ErrorOutcome {
    pub status: ConnectionStatus,
    pub server_down: bool,
    pub was_initial_load: bool,
}

/// Tracks renderer load latency and publishes connection status.
pub struct ConnectionMonitor {
    slow_threshold: Duration,
    auto_error_timeout: Duration,
    show_error_on_timeout: bool,
    initial_load: bool,
    load_started_at: Option<Instant>,
    status: ConnectionStatus,
    listeners: Vec<(ListenerId, Arc<dyn StatusListener>)>,
    next_listener_id: u64,
}

impl ConnectionMonitor {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            slow_threshold: config.slow_threshold(),
            auto_error_timeout: config.auto_error_timeout(),
            show_error_on_timeout: config.show_error_on_timeout,
            initial_load: true,
            load_started_at: None,
            status: ConnectionStatus::initial(),
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    /// Record a navigation start.
    ///
    /// Returns the delay after which the automatic error screen should fire,
    /// if one must be armed for this load. The caller cancels any previous
    /// auto-error timer before acting on the result.
    pub fn on_load_start(&mut self, url: &str, now: Instant) -> Option<Duration> {
        self.load_started_at = Some(now);
        tracing::debug!(url = %url, initial_load = self.initial_load, "Load started");

        if self.auto_error_enabled() {
            Some(self.auto_error_timeout)
        } else {
            None
        }
    }

    /// Record a navigation completion and publish a connected status.
    pub fn on_load_end(&mut self, url: &str, now: Instant) -> LoadOutcome {
        let loading_time = self
            .load_started_at
            .take()
            .map(|start| now.saturating_duration_since(start));
        let is_slow = loading_time.is_some_and(|t| t > self.slow_threshold);
        let was_initial_load = self.initial_load;
        self.initial_load = false;

        if let Some(elapsed) = loading_time {
            metrics::record_load_duration(elapsed);
        }
        if is_slow {
            tracing::warn!(
                url = %url,
                loading_time_ms = loading_time.map(|t| t.as_millis() as u64),
                threshold_ms = self.slow_threshold.as_millis() as u64,
                "Slow load detected"
            );
        }

        let status = ConnectionStatus::connected(url, loading_time, is_slow);
        self.publish(status.clone());
        LoadOutcome {
            status,
            was_initial_load,
        }
    }

    /// Record a navigation failure and publish a disconnected status.
    pub fn on_load_error(&mut self, error: &LoadError, url: &str) -> ErrorOutcome {
        self.load_started_at = None;
        let server_down = error.is_server_down();
        tracing::warn!(url = %url, error = %error, server_down, "Load failed");

        let status = ConnectionStatus::disconnected(url);
        self.publish(status.clone());
        ErrorOutcome {
            status,
            server_down,
            was_initial_load: self.initial_load,
        }
    }

    /// Whether an automatic error-screen timer may fire right now.
    pub fn auto_error_enabled(&self) -> bool {
        self.initial_load && self.show_error_on_timeout
    }

    pub fn set_slow_connection_threshold(&mut self, threshold: Duration) {
        tracing::info!(threshold_ms = threshold.as_millis() as u64, "Slow connection threshold updated");
        self.slow_threshold = threshold;
    }

    pub fn set_should_show_error_on_timeout(&mut self, enabled: bool) {
        tracing::debug!(enabled, "Automatic error-on-timeout toggled");
        self.show_error_on_timeout = enabled;
    }

    pub fn should_show_error_on_timeout(&self) -> bool {
        self.show_error_on_timeout
    }

    pub fn slow_connection_threshold(&self) -> Duration {
        self.slow_threshold
    }

    pub fn is_initial_load(&self) -> bool {
        self.initial_load
    }

    /// Current status snapshot.
    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Return to the freshly-constructed state, re-enabling error-on-timeout.
    ///
    /// Listeners and the configured slow threshold are kept.
    pub fn reset(&mut self) {
        self.show_error_on_timeout = true;
        self.initial_load = true;
        self.load_started_at = None;
        self.publish(ConnectionStatus::initial());
    }

    pub fn add_listener(&mut self, listener: Arc<dyn StatusListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn publish(&mut self, status: ConnectionStatus) {
        self.status = status;
        for (id, listener) in &self.listeners {
            let result = catch_unwind(AssertUnwindSafe(|| listener.on_status(&self.status)));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(listener = id.0, error = %e, "Status listener failed"),
                Err(_) => tracing::error!(listener = id.0, "Status listener panicked"),
            }
        }
    }
}
