//! Host-side units of work issued on behalf of scripts.

use std::time::Duration;

use async_trait::async_trait;
use ember_core::Value;

/// Failure of a [`Task`], optionally carrying a message for the script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskError {
    message: Option<String>,
}

impl TaskError {
    /// Failure with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// Failure without a message; the script sees a generic error.
    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    /// The message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub(crate) fn into_message(self) -> Option<String> {
        self.message
    }
}

/// Outcome of [`Task::execute`].
pub type TaskResult = Result<Vec<Value>, TaskError>;

/// An opaque unit of work run on the shared background pool.
#[async_trait]
pub trait Task: Send + Sync {
    /// Run the task, producing zero or more result values.
    async fn execute(&self) -> TaskResult;
}

#[async_trait]
impl<F> Task for F
where
    F: Fn() -> TaskResult + Send + Sync,
{
    async fn execute(&self) -> TaskResult {
        self()
    }
}

/// Produces no values. Backs `sleep`.
pub(crate) struct NoopTask;

#[async_trait]
impl Task for NoopTask {
    async fn execute(&self) -> TaskResult {
        Ok(Vec::new())
    }
}

/// Limits for the task bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskConfig {
    /// Maximum number of in-flight tasks across all devices.
    pub max_pending: usize,
    /// Length of one delay tick.
    pub tick: Duration,
}

impl TaskConfig {
    /// Create a config with the given limits.
    #[must_use]
    pub fn new(max_pending: usize, tick: Duration) -> Self {
        Self { max_pending, tick }
    }

    pub(crate) fn delay(&self, ticks: u32) -> Duration {
        self.tick.saturating_mul(ticks)
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            max_pending: 5000,
            tick: Duration::from_millis(50),
        }
    }
}
