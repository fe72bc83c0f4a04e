//! Fallback screen subsystem.
//!
//! # Data Flow
//! ```text
//! ConnectionStatus (health::connection)      ┐
//! Auto-error timer / server-down / remount   ├→ screen.rs (Normal / ConnectionError / ManualInstructions)
//! FallbackHandle commands (handle.rs)        ┘        │
//!                                                     ▼
//!                                          watch<FallbackView> → host UI
//!
//! Retry:
//!     FallbackHandle::retry → reachability.rs (probe raced against timeout)
//!     → success: monitor reset, recovery reset, Normal, reload in place
//!     → failure: stay on current screen
//! ```

pub mod handle;
pub mod reachability;
pub mod screen;

pub use handle::{FallbackCommand, FallbackControl, FallbackHandle};
pub use reachability::{probe_with_timeout, HttpReachability, ProbeError, ReachabilityProbe};
pub use screen::{ErrorTrigger, FallbackView, ScreenState, ScreenStateMachine, Transition};
