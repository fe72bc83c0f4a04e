//! Recovery escalation controller.
//!
//! # Policy
//! ```text
//! request within debounce window          → dropped
//! forced request                          → hard remount, attempts = 0
//! normal request, attempts + 1 >= limit   → hard remount, attempts = 0
//! normal request otherwise                → soft reload, attempts + 1
//! successful load                         → attempts = 0
//! ```
//!
//! # Design Decisions
//! - Debouncing applies to forced and normal requests alike
//! - There is no retry cap; debouncing bounds the rate instead
//! - Hard remount is the last automated remedy

use std::time::Duration;

use tokio::time::Instant;

use crate::config::RecoveryConfig;
use crate::observability::metrics;
use crate::resilience::failure::{Failure, RecoveryRequest};

/// Action the supervisor performs on the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Reload the current navigation in place.
    SoftReload,
    /// Destroy and recreate the renderer surface.
    HardRemount,
}

impl RecoveryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryAction::SoftReload => "soft_reload",
            RecoveryAction::HardRemount => "hard_remount",
        }
    }
}

/// Snapshot of the controller's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryState {
    pub last_action_at: Option<Instant>,
    pub soft_attempt_count: u32,
    pub debounce_window: Duration,
    pub escalation_threshold: u32,
}

/// Converts failure signals into debounced, escalating recovery actions.
pub struct RecoveryController {
    state: RecoveryState,
}

impl RecoveryController {
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            state: RecoveryState {
                last_action_at: None,
                soft_attempt_count: 0,
                debounce_window: config.debounce_window(),
                escalation_threshold: config.escalation_threshold.max(1),
            },
        }
    }

    /// Decide on a recovery action, or `None` if the request is debounced.
    pub fn request_recovery(&mut self, force_hard: bool, now: Instant) -> Option<RecoveryAction> {
        if let Some(last) = self.state.last_action_at {
            let since_last = now.saturating_duration_since(last);
            if since_last < self.state.debounce_window {
                tracing::debug!(
                    force_hard,
                    since_last_ms = since_last.as_millis() as u64,
                    "Recovery request debounced"
                );
                metrics::record_recovery_debounced();
                return None;
            }
        }

        if !force_hard {
            self.state.soft_attempt_count += 1;
        }

        let action = if force_hard || self.state.soft_attempt_count >= self.state.escalation_threshold {
            self.state.soft_attempt_count = 0;
            RecoveryAction::HardRemount
        } else {
            RecoveryAction::SoftReload
        };
        self.state.last_action_at = Some(now);

        tracing::info!(
            action = action.as_str(),
            force_hard,
            soft_attempts = self.state.soft_attempt_count,
            "Recovery action chosen"
        );
        metrics::record_recovery_action(action.as_str());
        Some(action)
    }

    /// Route a classified failure through the policy.
    pub fn handle_failure(&mut self, failure: Failure, now: Instant) -> Option<RecoveryAction> {
        match failure.recovery_request() {
            Some(RecoveryRequest::ForceHard) => self.request_recovery(true, now),
            Some(RecoveryRequest::Normal) => self.request_recovery(false, now),
            None => {
                tracing::debug!(failure = %failure, "Failure left to rendered content");
                None
            }
        }
    }

    /// A load completed; treat as evidence of health.
    pub fn on_load_success(&mut self) {
        if self.state.soft_attempt_count > 0 {
            tracing::debug!(soft_attempts = self.state.soft_attempt_count, "Recovery attempts reset after successful load");
        }
        self.state.soft_attempt_count = 0;
    }

    /// Forget all history, including the debounce reference point.
    pub fn reset(&mut self) {
        self.state.soft_attempt_count = 0;
        self.state.last_action_at = None;
    }

    pub fn state(&self) -> &RecoveryState {
        &self.state
    }
}
