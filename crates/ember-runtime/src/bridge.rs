//! Asynchronous host tasks correlated back to scripts by completion events.
//!
//! A script that needs the host to do something slow issues a [`Task`]. The
//! task runs on the shared tokio pool; when it finishes, a
//! [`COMPLETION_EVENT`] carrying the task id is pushed onto the issuing
//! device's event queue:
//!
//! ```text
//! ("task_complete", id, true,  result0, result1, ...)
//! ("task_complete", id, false, message?)
//! ```
//!
//! [`TaskBridge::execute_task`] turns this into a blocking-style call by
//! pulling completion events until the one for its own id arrives.
//! Completion events for other tasks pulled during that wait are discarded,
//! not requeued.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use ember_core::{DeviceId, Event, TaskId, Value};
use ember_events::{EventError, EventQueue, EventResult, EventStream};
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::task::{NoopTask, Task, TaskConfig};

/// Name of the event that reports a task's completion.
pub const COMPLETION_EVENT: &str = "task_complete";

/// Explicit result of waiting on a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The task succeeded with these values.
    Completed(Vec<Value>),
    /// The task failed, with its message if it gave one.
    Failed(Option<String>),
    /// The wait was interrupted before the task completed.
    Cancelled,
}

/// The suspension point of a running script: a blocking pull on its own
/// event queue.
#[async_trait]
pub trait ScriptContext: Send {
    /// Wait for the next event, discarding those whose name does not match
    /// `filter`.
    async fn pull_event(&mut self, filter: Option<&str>) -> EventResult<Event>;
}

#[async_trait]
impl ScriptContext for EventStream {
    async fn pull_event(&mut self, filter: Option<&str>) -> EventResult<Event> {
        self.pull(filter).await
    }
}

struct PendingTask {
    device: DeviceId,
    abort: Option<AbortHandle>,
}

struct Inner {
    config: TaskConfig,
    handle: Handle,
    next_id: AtomicU64,
    pending: Mutex<HashMap<TaskId, PendingTask>>,
}

impl Inner {
    fn pending(&self) -> MutexGuard<'_, HashMap<TaskId, PendingTask>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Issues host tasks and correlates their completions.
///
/// One bridge is shared by every device in the process: it owns the task id
/// counter and the pending task table. Cloning is cheap.
#[derive(Clone)]
pub struct TaskBridge {
    inner: Arc<Inner>,
}

impl TaskBridge {
    /// Create a bridge that runs tasks on `handle`.
    #[must_use]
    pub fn new(config: TaskConfig, handle: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                handle,
                next_id: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The limits this bridge enforces.
    #[must_use]
    pub fn config(&self) -> &TaskConfig {
        &self.inner.config
    }

    /// Number of tasks issued but not yet completed or cancelled.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending().len()
    }

    /// Whether `id` is still pending.
    #[must_use]
    pub fn is_pending(&self, id: TaskId) -> bool {
        self.inner.pending().contains_key(&id)
    }

    /// Register `task` and schedule it after `delay_ticks` ticks.
    ///
    /// The completion event is pushed onto `queue` once the task finishes.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::CapacityExceeded`] if the pending table is
    /// full. Nothing is registered in that case.
    pub fn issue_task(
        &self,
        queue: &EventQueue,
        task: Arc<dyn Task>,
        delay_ticks: u32,
    ) -> RuntimeResult<TaskId> {
        let mut pending = self.inner.pending();
        let limit = self.inner.config.max_pending;
        if pending.len() >= limit {
            warn!(device_id = %queue.device_id(), limit, "Pending task table full");
            return Err(RuntimeError::CapacityExceeded { limit });
        }

        let id = TaskId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        pending.insert(
            id,
            PendingTask {
                device: queue.device_id(),
                abort: None,
            },
        );

        // The worker cannot deregister before the abort handle is stored: it
        // needs the table lock held here.
        let delay = self.inner.config.delay(delay_ticks);
        let worker = self.inner.handle.spawn(run_task(
            Arc::clone(&self.inner),
            queue.clone(),
            id,
            task,
            delay,
        ));
        if let Some(entry) = pending.get_mut(&id) {
            entry.abort = Some(worker.abort_handle());
        }

        debug!(device_id = %queue.device_id(), task_id = %id, delay_ticks, "Issued task");
        Ok(id)
    }

    /// Issue `task` and wait for its completion.
    ///
    /// Returns the task's result values in order.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::CapacityExceeded`] if the task could not be issued.
    /// - [`RuntimeError::TaskExecution`] if the task failed.
    /// - [`RuntimeError::Interrupted`] / [`RuntimeError::Terminated`] if the
    ///   wait was aborted; the task is deregistered first.
    /// - [`RuntimeError::ProtocolViolation`] on a malformed completion event.
    pub async fn execute_task(
        &self,
        queue: &EventQueue,
        ctx: &mut dyn ScriptContext,
        task: Arc<dyn Task>,
        delay_ticks: u32,
    ) -> RuntimeResult<Vec<Value>> {
        let id = self.issue_task(queue, task, delay_ticks)?;
        match self.await_completion(ctx, id).await? {
            TaskOutcome::Completed(values) => Ok(values),
            TaskOutcome::Failed(message) => Err(RuntimeError::TaskExecution(message)),
            TaskOutcome::Cancelled => Err(RuntimeError::Interrupted),
        }
    }

    /// Park the calling script for `delay_ticks` ticks.
    ///
    /// # Errors
    ///
    /// As [`TaskBridge::execute_task`].
    pub async fn sleep(
        &self,
        queue: &EventQueue,
        ctx: &mut dyn ScriptContext,
        delay_ticks: u32,
    ) -> RuntimeResult<()> {
        self.execute_task(queue, ctx, Arc::new(NoopTask), delay_ticks)
            .await
            .map(|_| ())
    }

    /// Wait for the completion event of an already issued task.
    ///
    /// Completion events for other ids are discarded. An interrupted wait
    /// deregisters `id` and yields [`TaskOutcome::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Terminated`] if a `terminate` event arrives and
    /// [`RuntimeError::ProtocolViolation`] on a malformed completion event.
    /// `id` is deregistered in both cases.
    pub async fn await_completion(
        &self,
        ctx: &mut dyn ScriptContext,
        id: TaskId,
    ) -> RuntimeResult<TaskOutcome> {
        loop {
            let event = match ctx.pull_event(Some(COMPLETION_EVENT)).await {
                Ok(event) => event,
                Err(e) => {
                    self.cancel(id);
                    return match e {
                        EventError::Interrupted | EventError::Closed => {
                            debug!(task_id = %id, reason = %e, "Task wait interrupted");
                            Ok(TaskOutcome::Cancelled)
                        },
                        EventError::Terminated => Err(RuntimeError::Terminated),
                    };
                },
            };

            let completion = match Completion::parse(event.into_args()) {
                Ok(completion) => completion,
                Err(reason) => {
                    self.cancel(id);
                    return Err(RuntimeError::ProtocolViolation(reason));
                },
            };

            if completion.id != id {
                debug!(
                    task_id = %id,
                    discarded = %completion.id,
                    "Discarding completion of another task"
                );
                continue;
            }
            return Ok(completion.outcome);
        }
    }

    /// Deregister a pending task and abort its worker.
    ///
    /// Returns `false` if `id` was not pending. A cancelled task never
    /// produces a completion event.
    pub fn cancel(&self, id: TaskId) -> bool {
        let Some(entry) = self.inner.pending().remove(&id) else {
            return false;
        };
        if let Some(abort) = entry.abort {
            abort.abort();
        }
        debug!(device_id = %entry.device, task_id = %id, "Cancelled task");
        true
    }
}

impl std::fmt::Debug for TaskBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskBridge")
            .field("config", &self.inner.config)
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

async fn run_task(
    inner: Arc<Inner>,
    queue: EventQueue,
    id: TaskId,
    task: Arc<dyn Task>,
    delay: Duration,
) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let result = match AssertUnwindSafe(task.execute()).catch_unwind().await {
        Ok(result) => result,
        Err(_) => {
            warn!(device_id = %queue.device_id(), task_id = %id, "Task panicked");
            Err(crate::task::TaskError::silent())
        },
    };

    if inner.pending().remove(&id).is_none() {
        debug!(task_id = %id, "Task cancelled before completion, dropping result");
        return;
    }

    let mut args = vec![Value::Integer(i64::try_from(id.get()).unwrap_or(i64::MAX))];
    match result {
        Ok(values) => {
            args.push(Value::Boolean(true));
            args.extend(values);
        },
        Err(err) => {
            args.push(Value::Boolean(false));
            args.extend(err.into_message().map(Value::String));
        },
    }

    debug!(device_id = %queue.device_id(), task_id = %id, "Task complete");
    queue.queue_event(COMPLETION_EVENT, args);
}

/// A decoded completion event.
struct Completion {
    id: TaskId,
    outcome: TaskOutcome,
}

impl Completion {
    fn parse(args: Vec<Value>) -> Result<Self, String> {
        let mut args = args.into_iter();
        let id = args
            .next()
            .and_then(|v| v.as_integer())
            .and_then(|n| u64::try_from(n).ok())
            .map(TaskId::new)
            .ok_or_else(|| format!("{COMPLETION_EVENT} without a valid task id"))?;
        let ok = args
            .next()
            .and_then(|v| v.as_bool())
            .ok_or_else(|| format!("{COMPLETION_EVENT} for task {id} without a status"))?;

        let outcome = if ok {
            TaskOutcome::Completed(args.collect())
        } else {
            TaskOutcome::Failed(args.next().and_then(|v| match v {
                Value::String(message) => Some(message),
                _ => None,
            }))
        };
        Ok(Self { id, outcome })
    }
}
