//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Failure signal (heartbeat timeout, crash, HTTP status, terminate)
//!     → failure.rs (classify: normal / forced / not escalated)
//!     → recovery.rs (debounce, count soft attempts, escalate)
//!     → RecoveryAction executed by the supervisor on the renderer
//! ```
//!
//! # Design Decisions
//! - All failures are handled here first; only a subset reaches the user
//! - Forced requests skip escalation but not debouncing
//! - Successful loads reset the soft attempt counter

pub mod failure;
pub mod recovery;

pub use failure::{Failure, RecoveryRequest};
pub use recovery::{RecoveryAction, RecoveryController, RecoveryState};
