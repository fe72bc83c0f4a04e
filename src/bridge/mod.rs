//! Message bridge between host and renderer.
//!
//! # Data Flow
//! ```text
//! Renderer postMessage (JSON text)
//!     → message.rs (decode into closed Action set → BridgeMessage)
//!     → MessageBridge::route
//!         liveness (ack, ready state, height) → heartbeat ack counter
//!         connectionError                     → injected FallbackControl
//!         capability request                  → capability.rs handler (one slot per capability)
//!
//! Host → renderer
//!     OutboundMessage → ScriptBuilder → Renderer::inject_script
//! ```
//!
//! # Design Decisions
//! - Unknown actions are rejected at decode time, never silently dropped
//! - The bridge reaches the fallback screen only through the injected handle

pub mod capability;
pub mod message;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::fallback::FallbackControl;

pub use capability::{Capability, CapabilityError, CapabilityHandler, NoCapabilities};
pub use message::{BridgeMessage, OutboundMessage, ScriptBuilder};

/// Errors decoding a renderer message.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("malformed bridge message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown bridge action {0:?}")]
    UnknownAction(String),

    #[error("invalid data for {action}: {source}")]
    InvalidData {
        action: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// What the supervisor has to do with a routed message.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// Counts as a heartbeat acknowledgment.
    Liveness,
    /// Needs a capability request slot.
    Capability { capability: Capability, payload: Value },
    /// Fully handled by the bridge.
    Handled,
}

/// Decodes renderer messages and dispatches the ones it owns.
pub struct MessageBridge {
    fallback: Arc<dyn FallbackControl>,
}

impl MessageBridge {
    pub fn new(fallback: Arc<dyn FallbackControl>) -> Self {
        Self { fallback }
    }

    pub fn route(&self, raw: &str) -> Result<Routed, BridgeError> {
        let message = BridgeMessage::parse(raw)?;
        let routed = match message {
            BridgeMessage::HeartbeatAck { token } => {
                tracing::trace!(token = %token, "Heartbeat ack received");
                Routed::Liveness
            }
            BridgeMessage::DocumentReady { ready_state } => {
                tracing::trace!(ready_state = %ready_state, "Document ready state received");
                Routed::Liveness
            }
            BridgeMessage::ContentHeight { height } => {
                tracing::trace!(height, "Content height received");
                Routed::Liveness
            }
            BridgeMessage::ConnectionError => {
                tracing::info!("Renderer requested the connection error screen");
                self.fallback.show_connection_error();
                Routed::Handled
            }
            BridgeMessage::Capability { capability, payload } => Routed::Capability { capability, payload },
        };
        Ok(routed)
    }
}
