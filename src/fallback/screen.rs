//! Fallback screen state machine.
//!
//! # States
//! - Normal: renderer visible
//! - ConnectionError: blocking failure UI with retry and manual-instructions actions
//! - ManualInstructions: static help with a back-to-error action
//!
//! # State Transitions
//! ```text
//! Normal → ConnectionError:      initial-load disconnect or slow load,
//!                                or any error trigger
//! ConnectionError/Manual:        automatic triggers are ignored
//! ConnectionError → Normal:      successful retry, or a connected status
//!                                within the screen's slow threshold
//! ConnectionError ↔ Manual:      user navigation (External trigger for the way back)
//! any → Normal:                  explicit show_normal
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::FallbackConfig;
use crate::health::ConnectionStatus;
use crate::observability::metrics;

/// What the user sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenState {
    #[default]
    Normal,
    ConnectionError,
    ManualInstructions,
}

impl ScreenState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenState::Normal => "normal",
            ScreenState::ConnectionError => "connection_error",
            ScreenState::ManualInstructions => "manual_instructions",
        }
    }
}

/// Why the connection error screen was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTrigger {
    /// The initial load did not finish before the automatic timeout.
    AutoErrorTimeout,
    /// A load failed with a server-down classified error.
    ServerDown,
    /// A forced hard remount happened before the initial load completed.
    ForcedRemount,
    /// A caller outside the supervisor asked for it.
    External,
}

impl ErrorTrigger {
    /// Raised by the supervisor itself rather than by a user or collaborator.
    pub fn is_automatic(&self) -> bool {
        !matches!(self, ErrorTrigger::External)
    }
}

/// A state change, reported so the caller can publish it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ScreenState,
    pub to: ScreenState,
}

/// Snapshot handed to UIs: current screen plus the busy indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FallbackView {
    pub state: ScreenState,
    /// True while at least one retry probe is outstanding.
    pub retrying: bool,
}

/// Three-state controller for the fallback UI.
pub struct ScreenStateMachine {
    state: ScreenState,
    slow_threshold: Duration,
    retries_in_flight: usize,
}

impl ScreenStateMachine {
    pub fn new(config: &FallbackConfig) -> Self {
        Self {
            state: ScreenState::Normal,
            slow_threshold: config.slow_threshold(),
            retries_in_flight: 0,
        }
    }

    /// React to a published connection status.
    ///
    /// `initial_load` is whether the status belongs to the initial-load cycle.
    pub fn on_connection_status(&mut self, status: &ConnectionStatus, initial_load: bool) -> Option<Transition> {
        let loading_time = status.loading_time();
        match self.state {
            ScreenState::Normal if initial_load => {
                if !status.connected {
                    tracing::warn!(url = ?status.url, "Initial load disconnected");
                    self.transition(ScreenState::ConnectionError)
                } else if loading_time.is_some_and(|t| t > self.slow_threshold) {
                    tracing::warn!(
                        loading_time_ms = status.loading_time_ms,
                        threshold_ms = self.slow_threshold.as_millis() as u64,
                        "Initial load too slow"
                    );
                    self.transition(ScreenState::ConnectionError)
                } else {
                    None
                }
            }
            ScreenState::ConnectionError
                if status.connected && loading_time.is_some_and(|t| t <= self.slow_threshold) =>
            {
                tracing::info!(url = ?status.url, "Connection restored");
                self.transition(ScreenState::Normal)
            }
            _ => None,
        }
    }

    /// Enter ConnectionError from Normal.
    ///
    /// Only an [`ErrorTrigger::External`] request may also return to it from
    /// ManualInstructions; automatic triggers leave the help screen alone.
    pub fn show_connection_error(&mut self, trigger: ErrorTrigger) -> Option<Transition> {
        tracing::info!(trigger = ?trigger, from = self.state.as_str(), "Connection error screen requested");
        if self.state == ScreenState::ManualInstructions && trigger.is_automatic() {
            tracing::debug!(trigger = ?trigger, "User is reading manual instructions, not interrupting");
            return None;
        }
        self.transition(ScreenState::ConnectionError)
    }

    /// Open the help screen. Only reachable from ConnectionError.
    pub fn show_manual_instructions(&mut self) -> Option<Transition> {
        if self.state != ScreenState::ConnectionError {
            tracing::debug!(from = self.state.as_str(), "Manual instructions only reachable from the error screen");
            return None;
        }
        self.transition(ScreenState::ManualInstructions)
    }

    pub fn show_normal(&mut self) -> Option<Transition> {
        self.transition(ScreenState::Normal)
    }

    /// A retry probe was started.
    pub fn retry_started(&mut self) {
        self.retries_in_flight += 1;
    }

    /// A retry probe finished. Success always returns to Normal.
    pub fn retry_finished(&mut self, reachable: bool) -> Option<Transition> {
        self.retries_in_flight = self.retries_in_flight.saturating_sub(1);
        if reachable {
            self.transition(ScreenState::Normal)
        } else {
            tracing::info!(state = self.state.as_str(), "Retry failed, staying on current screen");
            None
        }
    }

    pub fn state(&self) -> ScreenState {
        self.state
    }

    pub fn is_retrying(&self) -> bool {
        self.retries_in_flight > 0
    }

    pub fn view(&self) -> FallbackView {
        FallbackView {
            state: self.state,
            retrying: self.is_retrying(),
        }
    }

    pub fn slow_threshold(&self) -> Duration {
        self.slow_threshold
    }

    fn transition(&mut self, to: ScreenState) -> Option<Transition> {
        if self.state == to {
            return None;
        }
        let from = std::mem::replace(&mut self.state, to);
        tracing::info!(from = from.as_str(), to = to.as_str(), "Screen transition");
        metrics::record_screen_transition(to.as_str());
        Some(Transition { from, to })
    }
}
