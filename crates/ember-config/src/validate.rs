//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_runtime(config)?;
    validate_limits(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_runtime(config: &Config) -> ConfigResult<()> {
    if config.runtime.id.trim().is_empty() {
        return Err(invalid("runtime.id", "must not be empty"));
    }
    if config.runtime.default_id.trim().is_empty() {
        return Err(invalid("runtime.default_id", "must not be empty"));
    }
    Ok(())
}

fn validate_limits(config: &Config) -> ConfigResult<()> {
    if config.tasks.max_pending == 0 {
        return Err(invalid("tasks.max_pending", "must be greater than 0"));
    }
    if config.tasks.tick_ms == 0 {
        return Err(invalid("tasks.tick_ms", "must be greater than 0"));
    }
    if config.events.queue_capacity == 0 {
        return Err(invalid("events.queue_capacity", "must be greater than 0"));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }
    let format = config.logging.format.to_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: {}",
                config.logging.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    Ok(())
}
