//! Failure taxonomy for renderer supervision.

use thiserror::Error;

/// How a failure should enter the recovery controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryRequest {
    /// Counts toward escalation; soft reload until the threshold is reached.
    Normal,
    /// Always performs a hard remount (still subject to debouncing).
    ForceHard,
}

/// A detected renderer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Failure {
    #[error("no heartbeat acknowledgment within the window")]
    LivenessTimeout,

    #[error("renderer content process terminated")]
    RendererCrash,

    #[error("renderer process lost without crashing")]
    RendererStalled,

    #[error("server error (status {status})")]
    ServerError { status: u16 },

    #[error("client error (status {status})")]
    ClientError { status: u16 },
}

impl Failure {
    /// Classify a main-document HTTP status.
    ///
    /// Status 0 means the request failed below HTTP. Statuses below 400 are
    /// not failures.
    pub fn from_http_status(status: u16) -> Option<Self> {
        match status {
            0 | 500..=u16::MAX => Some(Failure::ServerError { status }),
            400..=499 => Some(Failure::ClientError { status }),
            _ => None,
        }
    }

    /// Classify a renderer-process loss signal.
    pub fn from_process_lost(did_crash: bool) -> Self {
        if did_crash {
            Failure::RendererCrash
        } else {
            Failure::RendererStalled
        }
    }

    /// How this failure is fed to the recovery controller, if at all.
    ///
    /// Client errors are left to the rendered content.
    pub fn recovery_request(&self) -> Option<RecoveryRequest> {
        match self {
            Failure::RendererCrash => Some(RecoveryRequest::ForceHard),
            Failure::LivenessTimeout | Failure::RendererStalled | Failure::ServerError { .. } => {
                Some(RecoveryRequest::Normal)
            }
            Failure::ClientError { .. } => None,
        }
    }

    /// Short name used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::LivenessTimeout => "liveness_timeout",
            Failure::RendererCrash => "renderer_crash",
            Failure::RendererStalled => "renderer_stalled",
            Failure::ServerError { .. } => "server_error",
            Failure::ClientError { .. } => "client_error",
        }
    }
}
