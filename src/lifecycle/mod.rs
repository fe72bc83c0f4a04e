//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Spawn (supervisor::SupervisorBuilder::spawn):
//!     Config → components → event loop task → SupervisorHandle
//!
//! Pending work (slots.rs):
//!     Timer / capability request → TaskSlot (one occupant, generation-stamped)
//!     New cycle → previous occupant aborted
//!
//! Dispose (shutdown.rs):
//!     SupervisorHandle::dispose → broadcast → loop exits → every slot cancelled
//! ```
//!
//! # Design Decisions
//! - Disposal is idempotent and leaves no spawned task behind
//! - Stale completions are filtered by generation, not by timing

pub mod shutdown;
pub mod slots;

pub use shutdown::Shutdown;
pub use slots::TaskSlot;
