//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SupervisorConfig (validated, immutable)
//!     → handed to SupervisorBuilder and the host binary
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → host applies runtime-tunable thresholds via SupervisorHandle
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only thresholds are tunable at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::{
    BridgeConfig, ConnectionConfig, FallbackConfig, HeartbeatConfig, ObservabilityConfig,
    RecoveryConfig, SupervisorConfig,
};
