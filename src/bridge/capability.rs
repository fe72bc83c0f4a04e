//! Capability bridge seam.
//!
//! The device capabilities themselves (camera, gallery, geolocation, push
//! registration) live outside this crate. The supervisor only guarantees one
//! outstanding request per capability and cancels them all on dispose.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A device capability reachable through the message bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Camera,
    Gallery,
    Geolocation,
    PushToken,
}

impl Capability {
    /// Action name used to deliver a result back into the renderer.
    pub fn result_action(&self) -> &'static str {
        match self {
            Capability::Camera => "cameraResult",
            Capability::Gallery => "galleryResult",
            Capability::Geolocation => "geolocationResult",
            Capability::PushToken => "pushTokenResult",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Camera => "camera",
            Capability::Gallery => "gallery",
            Capability::Geolocation => "geolocation",
            Capability::PushToken => "push_token",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors a capability request can finish with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("a {0} request is already outstanding")]
    Busy(Capability),

    #[error("{0} is not available on this host")]
    Unsupported(Capability),

    #[error("{0} permission denied")]
    PermissionDenied(Capability),

    #[error("{capability} request failed: {reason}")]
    Failed { capability: Capability, reason: String },
}

/// Collaborator that fulfils capability requests.
pub trait CapabilityHandler: Send + Sync + 'static {
    /// Start a request. The returned future is dropped if the supervisor is disposed.
    fn handle(&self, capability: Capability, payload: Value) -> BoxFuture<'static, Result<Value, CapabilityError>>;
}

/// Handler for hosts that expose no capabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapabilities;

impl CapabilityHandler for NoCapabilities {
    fn handle(&self, capability: Capability, _payload: Value) -> BoxFuture<'static, Result<Value, CapabilityError>> {
        Box::pin(async move { Err(CapabilityError::Unsupported(capability)) })
    }
}
