//! Runtime error types.

use ember_events::EventError;
use ember_vfs::VfsError;
use thiserror::Error;

/// Message used when a failed task did not supply one.
pub const GENERIC_TASK_FAILURE: &str = "task failed";

/// Errors that can occur while bridging host and guest.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// The pending task table is full.
    #[error("Too many pending tasks (limit {limit})")]
    CapacityExceeded {
        /// Configured table size.
        limit: usize,
    },

    /// A request broke the host/guest protocol.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// No runtime backend could be resolved.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A task's `execute` faulted.
    #[error("{}", .0.as_deref().unwrap_or(GENERIC_TASK_FAILURE))]
    TaskExecution(Option<String>),

    /// The wait was cancelled from outside the script.
    #[error("Interrupted")]
    Interrupted,

    /// A `terminate` event arrived while waiting.
    #[error("Terminated")]
    Terminated,

    /// A capability reported a scripting error.
    #[error("{0}")]
    Script(String),

    /// A filesystem operation failed.
    #[error("Filesystem error: {0}")]
    Vfs(VfsError),
}

impl RuntimeError {
    /// Whether this error crosses into the guest as a scripting error.
    ///
    /// Configuration failures abort device bring-up and interruptions are
    /// cooperative cancellation, so neither reaches a script.
    #[must_use]
    pub fn is_script_visible(&self) -> bool {
        !matches!(self, Self::Configuration(_) | Self::Interrupted)
    }
}

impl From<VfsError> for RuntimeError {
    fn from(err: VfsError) -> Self {
        match err {
            VfsError::ProtocolViolation(_) => Self::ProtocolViolation(err.to_string()),
            other => Self::Vfs(other),
        }
    }
}

impl From<EventError> for RuntimeError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::Interrupted | EventError::Closed => Self::Interrupted,
            EventError::Terminated => Self::Terminated,
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
