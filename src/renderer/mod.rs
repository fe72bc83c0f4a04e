//! Managed renderer boundary.
//!
//! # Data Flow
//! ```text
//! Host UI (collaborator)
//!     → RendererEvent (load start/end/error, HTTP status, crash, message, foreground)
//!     → Supervisor event loop
//!
//! Supervisor
//!     → Renderer::reload_in_place   (soft reload)
//!     → Renderer::recreate_surface  (hard remount)
//!     → Renderer::inject_script     (heartbeat, bridge replies)
//! ```
//!
//! # Design Decisions
//! - The renderer is opaque: the supervisor only sees lifecycle callbacks
//! - Commands are fire-and-forget; failures are logged, never fatal

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::health::status::LoadError;

/// Errors a renderer command can report back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RendererError {
    /// The surface is not attached (e.g. mid-remount).
    #[error("renderer surface is detached")]
    Detached,

    /// The host rejected the command.
    #[error("renderer command rejected: {0}")]
    Rejected(String),
}

/// Commands the supervisor issues to the managed renderer.
///
/// Implementations are called from the supervisor's event loop and must not block.
pub trait Renderer: Send + Sync + 'static {
    /// Reload the current navigation in place.
    fn reload_in_place(&self) -> Result<(), RendererError>;

    /// Destroy and recreate the renderer surface.
    fn recreate_surface(&self) -> Result<(), RendererError>;

    /// Evaluate a script inside the renderer.
    fn inject_script(&self, code: &str) -> Result<(), RendererError>;
}

/// Lifecycle callbacks the host forwards from the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RendererEvent {
    LoadStart { url: String },
    LoadEnd { url: String },
    LoadError { error: LoadError, url: String },
    HttpStatus { code: u16 },
    ContentProcessTerminated,
    RenderProcessLost { did_crash: bool },
    Message { raw: String },
    Foreground,
}

impl RendererEvent {
    /// Short name used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RendererEvent::LoadStart { .. } => "load_start",
            RendererEvent::LoadEnd { .. } => "load_end",
            RendererEvent::LoadError { .. } => "load_error",
            RendererEvent::HttpStatus { .. } => "http_status",
            RendererEvent::ContentProcessTerminated => "content_process_terminated",
            RendererEvent::RenderProcessLost { .. } => "render_process_lost",
            RendererEvent::Message { .. } => "message",
            RendererEvent::Foreground => "foreground",
        }
    }
}
