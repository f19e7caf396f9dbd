//! Event queue error types.

use thiserror::Error;

/// Errors returned while waiting on a device's event stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The wait was interrupted from outside (device shutdown or script kill).
    #[error("Event wait interrupted")]
    Interrupted,

    /// Every sender was dropped; the device is gone.
    #[error("Event queue closed")]
    Closed,

    /// A `terminate` event arrived while waiting for another event.
    #[error("Terminated")]
    Terminated,
}

impl EventError {
    /// Whether this error means the waiting script is being torn down, rather
    /// than a fault the script should observe.
    #[must_use]
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Interrupted | Self::Closed)
    }
}

/// Convenience result type for event operations.
pub type EventResult<T> = Result<T, EventError>;
