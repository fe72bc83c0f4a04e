//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Honor `RUST_LOG` first, then the configured level
//!
//! # Design Decisions
//! - JSON format for production, pretty format for development

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Build the filter: `RUST_LOG` wins, otherwise the configured level for this crate.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("renderer_supervisor={}", config.log_level).into())
}

/// Install the global subscriber. Returns false if one was already installed.
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let filter = env_filter(config);
    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.is_ok()
}
