//! Renderer health subsystem.
//!
//! # Data Flow
//! ```text
//! Active liveness checks (heartbeat.rs):
//!     Host foreground transition
//!     → Inject liveness token via message bridge
//!     → Window elapses without ack → soft recovery request
//!
//! Passive load observation (connection.rs):
//!     Renderer load start/end/error
//!     → Classify latency (slow) and errors (server down)
//!     → Publish ConnectionStatus (status.rs) to listeners
//!     → Fallback screen state machine
//! ```
//!
//! # Design Decisions
//! - Active and passive checks are complementary
//! - Both are pure state machines; the supervisor owns their timers
//! - ConnectionStatus snapshots are replaced, never mutated

pub mod connection;
pub mod heartbeat;
pub mod status;

pub use connection::{ConnectionMonitor, ListenerError, ListenerId, StatusListener};
pub use heartbeat::{HeartbeatProbe, LivenessToken, ProbeVerdict};
pub use status::{ConnectionStatus, LoadError, NetworkFailure};
