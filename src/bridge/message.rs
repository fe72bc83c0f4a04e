//! Wire format of the host/renderer message channel.
//!
//! Messages are JSON text of shape `{ "action": string, "data": any }`.
//! The action string is decoded into the closed [`Action`] set before any
//! payload is looked at, so dispatch is an exhaustive match.

use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::de::IntoDeserializer;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::bridge::capability::Capability;
use crate::bridge::BridgeError;
use crate::config::BridgeConfig;

/// Every action the host understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    HeartbeatAck,
    DocumentReady,
    ContentHeight,
    ConnectionError,
    OpenCamera,
    PickImage,
    GetLocation,
    RegisterPushToken,
}

impl Action {
    fn parse(action: &str) -> Result<Self, BridgeError> {
        let de: StrDeserializer<'_, ValueError> = action.into_deserializer();
        Action::deserialize(de).map_err(|_| BridgeError::UnknownAction(action.to_string()))
    }
}

#[derive(Deserialize)]
struct Envelope {
    action: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct AckData {
    token: String,
}

/// A decoded renderer → host message.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeMessage {
    HeartbeatAck { token: String },
    DocumentReady { ready_state: String },
    ContentHeight { height: f64 },
    /// The page asks the host to show the connection-error screen.
    ConnectionError,
    Capability { capability: Capability, payload: Value },
}

impl BridgeMessage {
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let envelope: Envelope = serde_json::from_str(raw)?;
        let action = Action::parse(&envelope.action)?;
        let data = envelope.data;

        let message = match action {
            Action::HeartbeatAck => {
                let ack: AckData = decode_data("heartbeatAck", data)?;
                BridgeMessage::HeartbeatAck { token: ack.token }
            }
            Action::DocumentReady => BridgeMessage::DocumentReady {
                ready_state: decode_data("documentReady", data)?,
            },
            Action::ContentHeight => BridgeMessage::ContentHeight {
                height: decode_data("contentHeight", data)?,
            },
            Action::ConnectionError => BridgeMessage::ConnectionError,
            Action::OpenCamera => capability(Capability::Camera, data),
            Action::PickImage => capability(Capability::Gallery, data),
            Action::GetLocation => capability(Capability::Geolocation, data),
            Action::RegisterPushToken => capability(Capability::PushToken, data),
        };
        Ok(message)
    }

    /// Whether the message proves the renderer's script engine is running.
    pub fn is_liveness_signal(&self) -> bool {
        matches!(
            self,
            BridgeMessage::HeartbeatAck { .. }
                | BridgeMessage::DocumentReady { .. }
                | BridgeMessage::ContentHeight { .. }
        )
    }
}

fn capability(capability: Capability, payload: Value) -> BridgeMessage {
    BridgeMessage::Capability { capability, payload }
}

fn decode_data<T: serde::de::DeserializeOwned>(action: &'static str, data: Value) -> Result<T, BridgeError> {
    serde_json::from_value(data).map_err(|source| BridgeError::InvalidData { action, source })
}

/// A host → renderer message.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// Asks the renderer to acknowledge a liveness token.
    HeartbeatRequest { token: String },
    /// Completes an outstanding capability request.
    CapabilityResult {
        capability: Capability,
        outcome: Result<Value, String>,
    },
}

impl OutboundMessage {
    pub fn to_json(&self) -> Value {
        match self {
            OutboundMessage::HeartbeatRequest { token } => json!({
                "action": "heartbeat",
                "data": { "token": token },
            }),
            OutboundMessage::CapabilityResult { capability, outcome } => {
                let data = match outcome {
                    Ok(result) => json!({ "ok": true, "result": result }),
                    Err(error) => json!({ "ok": false, "error": error }),
                };
                json!({ "action": capability.result_action(), "data": data })
            }
        }
    }
}

/// Renders outbound messages into scripts for `Renderer::inject_script`.
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    post_function: String,
    deliver_function: String,
}

impl ScriptBuilder {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            post_function: config.post_function.clone(),
            deliver_function: config.deliver_function.clone(),
        }
    }

    /// Script text for a message.
    ///
    /// A heartbeat request acknowledges itself from inside the renderer, so
    /// the ack only depends on the script engine running, not on page code.
    pub fn render(&self, message: &OutboundMessage) -> String {
        match message {
            OutboundMessage::HeartbeatRequest { token } => {
                let ack = js_string(&json!({ "action": "heartbeatAck", "data": { "token": token } }));
                format!(
                    "(function(){{try{{{post}({ack});{post}(JSON.stringify({{action:'documentReady',data:document.readyState}}));}}catch(e){{}}}})();true;",
                    post = self.post_function,
                    ack = ack,
                )
            }
            OutboundMessage::CapabilityResult { .. } => {
                format!(
                    "(function(){{try{{{deliver}({payload});}}catch(e){{}}}})();true;",
                    deliver = self.deliver_function,
                    payload = js_string(&message.to_json()),
                )
            }
        }
    }
}

/// Encode a JSON value as a JS string literal containing its text.
fn js_string(value: &Value) -> String {
    Value::String(value.to_string()).to_string()
}
