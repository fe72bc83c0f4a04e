//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, thresholds >= 1)
//! - Check the reachability endpoint is a usable URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SupervisorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::SupervisorConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("fallback.reachability_url is invalid: {0}")]
    InvalidUrl(String),

    #[error("fallback.reachability_url must use http or https, got {0}")]
    UnsupportedScheme(String),

    #[error("observability.log_format must be \"pretty\" or \"json\", got {0:?}")]
    UnknownLogFormat(String),

    #[error("bridge.{field} must not be empty")]
    EmptyFunction { field: &'static str },
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &SupervisorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let windows = [
        ("heartbeat.ack_window_ms", config.heartbeat.ack_window_ms),
        ("connection.slow_threshold_ms", config.connection.slow_threshold_ms),
        ("connection.auto_error_timeout_ms", config.connection.auto_error_timeout_ms),
        ("recovery.debounce_ms", config.recovery.debounce_ms),
        ("fallback.slow_threshold_ms", config.fallback.slow_threshold_ms),
        ("fallback.reachability_timeout_ms", config.fallback.reachability_timeout_ms),
    ];
    for (field, value) in windows {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if config.recovery.escalation_threshold == 0 {
        errors.push(ValidationError::Zero {
            field: "recovery.escalation_threshold",
        });
    }

    match url::Url::parse(&config.fallback.reachability_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::UnsupportedScheme(url.scheme().to_string())),
        Err(e) => errors.push(ValidationError::InvalidUrl(e.to_string())),
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::UnknownLogFormat(
            config.observability.log_format.clone(),
        ));
    }

    if config.bridge.post_function.trim().is_empty() {
        errors.push(ValidationError::EmptyFunction { field: "post_function" });
    }
    if config.bridge.deliver_function.trim().is_empty() {
        errors.push(ValidationError::EmptyFunction { field: "deliver_function" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
