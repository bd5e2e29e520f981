//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (max backoff > 0)
//! - Check log levels parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Runs before config is accepted into the system

use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::config::schema::{BackoffConfig, GuardConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("guard.max_backoff_secs must be greater than zero")]
    ZeroMaxBackoff,

    #[error("{field}: unknown log level '{value}'")]
    InvalidLogLevel { field: &'static str, value: String },
}

/// Parse a level name such as `"warn"` or `"DEBUG"`.
///
/// Blank input is not a level, even though `LevelFilter`'s own parser reads
/// it as `ERROR`.
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse().ok()
}

/// Validate guard settings, returning the parsed log level.
pub fn validate_guard(config: &GuardConfig) -> Result<LevelFilter, Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.max_backoff_secs == 0 {
        errors.push(ValidationError::ZeroMaxBackoff);
    }

    let level = parse_level(&config.log_level);
    if level.is_none() {
        errors.push(ValidationError::InvalidLogLevel {
            field: "guard.log_level",
            value: config.log_level.clone(),
        });
    }

    match level {
        Some(level) if errors.is_empty() => Ok(level),
        _ => Err(errors),
    }
}

pub fn validate_config(config: &BackoffConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_guard(&config.guard).err().unwrap_or_default();

    if parse_level(&config.observability.log_level).is_none() {
        errors.push(ValidationError::InvalidLogLevel {
            field: "observability.log_level",
            value: config.observability.log_level.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
