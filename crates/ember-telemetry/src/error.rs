//! Telemetry error types.

use thiserror::Error;

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A level or directive could not be parsed.
    #[error("invalid logging configuration: {0}")]
    ConfigError(String),

    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    InitError(String),

    /// The log directory could not be prepared.
    #[error("log file error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
