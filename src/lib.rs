//! Liveness and recovery supervisor for an embedded, host-opaque renderer.

pub mod bridge;
pub mod config;
pub mod fallback;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod renderer;
pub mod resilience;
pub mod supervisor;

pub use config::schema::SupervisorConfig;
pub use fallback::{FallbackControl, FallbackHandle, ScreenState};
pub use renderer::{Renderer, RendererError, RendererEvent};
pub use supervisor::{SupervisorBuilder, SupervisorError, SupervisorHandle};
