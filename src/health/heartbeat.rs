//! Heartbeat probe (active liveness checking).
//!
//! # Responsibilities
//! - Issue one liveness token into the renderer per foreground transition
//! - Count acknowledgments coming back over the message bridge
//! - Declare a liveness failure when the window elapses without any ack
//!
//! # Design Decisions
//! - Acks are counted, not matched per token: any liveness signal since the
//!   probe started proves the script engine is running
//! - A new foreground transition supersedes the outstanding probe

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::bridge::message::OutboundMessage;
use crate::config::HeartbeatConfig;
use crate::observability::metrics;

/// Opaque identifier of a single heartbeat probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessToken {
    pub value: Uuid,
    pub issued_at: Instant,
}

impl LivenessToken {
    fn new(issued_at: Instant) -> Self {
        Self {
            value: Uuid::new_v4(),
            issued_at,
        }
    }
}

#[derive(Debug)]
struct OutstandingProbe {
    token: LivenessToken,
    acks_at_issue: u64,
}

/// Outcome of an expired acknowledgment window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// At least one acknowledgment arrived in time.
    Alive,
    /// No acknowledgment arrived; the renderer is considered stalled.
    Failed,
    /// The timer belonged to a probe that was already superseded.
    Stale,
}

/// Heartbeat-based liveness detector.
pub struct HeartbeatProbe {
    ack_window: Duration,
    acks_observed: u64,
    outstanding: Option<OutstandingProbe>,
}

impl HeartbeatProbe {
    pub fn new(config: &HeartbeatConfig) -> Self {
        Self {
            ack_window: config.ack_window(),
            acks_observed: 0,
            outstanding: None,
        }
    }

    /// Start a fresh probe, superseding any outstanding one.
    ///
    /// Returns the token and the message to inject into the renderer.
    pub fn start(&mut self, now: Instant) -> (LivenessToken, OutboundMessage) {
        if let Some(previous) = self.outstanding.take() {
            tracing::debug!(token = %previous.token.value, "Superseding outstanding heartbeat probe");
        }

        let token = LivenessToken::new(now);
        self.outstanding = Some(OutstandingProbe {
            token: token.clone(),
            acks_at_issue: self.acks_observed,
        });
        tracing::debug!(token = %token.value, window_ms = self.ack_window.as_millis() as u64, "Heartbeat probe issued");

        let message = OutboundMessage::HeartbeatRequest {
            token: token.value.to_string(),
        };
        (token, message)
    }

    /// Record any liveness signal from the renderer.
    pub fn record_ack(&mut self) {
        self.acks_observed += 1;
    }

    /// Evaluate the probe identified by `token` once its window has elapsed.
    pub fn on_window_elapsed(&mut self, token: Uuid) -> ProbeVerdict {
        let probe = match self.outstanding.take() {
            Some(probe) if probe.token.value == token => probe,
            other => {
                self.outstanding = other;
                return ProbeVerdict::Stale;
            }
        };

        if self.acks_observed > probe.acks_at_issue {
            tracing::debug!(token = %token, "Heartbeat acknowledged");
            ProbeVerdict::Alive
        } else {
            tracing::warn!(
                token = %token,
                window_ms = self.ack_window.as_millis() as u64,
                "Heartbeat not acknowledged, renderer appears stalled"
            );
            metrics::record_heartbeat_failure();
            ProbeVerdict::Failed
        }
    }

    /// Drop any outstanding probe.
    pub fn cancel(&mut self) {
        self.outstanding = None;
    }

    pub fn ack_window(&self) -> Duration {
        self.ack_window
    }

    pub fn acks_observed(&self) -> u64 {
        self.acks_observed
    }

    pub fn is_outstanding(&self) -> bool {
        self.outstanding.is_some()
    }
}
