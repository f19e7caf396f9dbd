//! Bounded FIFO event queue for a single device.

use ember_core::{DeviceId, Event, Value};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::error::{EventError, EventResult};

/// Default number of events a device queue can hold before dropping.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Name of the event that terminates a waiting script.
pub const TERMINATE_EVENT: &str = "terminate";

/// Create the event queue of a device.
///
/// Returns the cloneable sending half and the single receiving half. A
/// `capacity` of zero is treated as one.
#[must_use]
pub fn channel(device_id: DeviceId, capacity: usize) -> (EventQueue, EventStream) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let queue = EventQueue { device_id, sender };
    let stream = EventStream {
        device_id,
        receiver,
        interrupt: CancellationToken::new(),
    };
    (queue, stream)
}

/// Sending half of a device event queue.
///
/// Cheap to clone; the task bridge keeps a clone per in-flight task so a
/// completion can be delivered after the issuing call has returned.
#[derive(Debug, Clone)]
pub struct EventQueue {
    device_id: DeviceId,
    sender: mpsc::Sender<Event>,
}

impl EventQueue {
    /// The device this queue delivers to.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Push an event onto the back of the queue.
    ///
    /// Returns `false` if the event was dropped because the queue is full or
    /// the device's stream no longer exists.
    pub fn push(&self, event: Event) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(
                    device_id = %self.device_id,
                    event = event.name(),
                    "Event queue full, dropping event"
                );
                false
            },
            Err(TrySendError::Closed(event)) => {
                trace!(
                    device_id = %self.device_id,
                    event = event.name(),
                    "Event queue closed, dropping event"
                );
                false
            },
        }
    }

    /// Build and push an event.
    pub fn queue_event(&self, name: impl Into<String>, args: Vec<Value>) -> bool {
        self.push(Event::new(name, args))
    }

    /// Whether the receiving stream has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Receiving half of a device event queue, owned by the script worker.
#[derive(Debug)]
pub struct EventStream {
    device_id: DeviceId,
    receiver: mpsc::Receiver<Event>,
    interrupt: CancellationToken,
}

impl EventStream {
    /// The device this stream belongs to.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Token that interrupts any current and future pull when cancelled.
    #[must_use]
    pub fn interrupt_token(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    /// Whether this stream has been interrupted.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_cancelled()
    }

    /// Number of events currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether no events are currently queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Wait for the next event, optionally filtered by name.
    ///
    /// Events are consumed strictly in FIFO order. With a filter, events
    /// whose name does not match are discarded. A `terminate` event aborts
    /// the pull with [`EventError::Terminated`] unless the filter asks for
    /// `terminate` itself.
    ///
    /// # Errors
    ///
    /// - [`EventError::Interrupted`] if the interrupt token is cancelled.
    /// - [`EventError::Closed`] if every [`EventQueue`] has been dropped.
    /// - [`EventError::Terminated`] if a `terminate` event is pulled.
    pub async fn pull(&mut self, filter: Option<&str>) -> EventResult<Event> {
        loop {
            let event = tokio::select! {
                biased;
                () = self.interrupt.cancelled() => return Err(EventError::Interrupted),
                received = self.receiver.recv() => received.ok_or(EventError::Closed)?,
            };

            if event.is(TERMINATE_EVENT) && filter != Some(TERMINATE_EVENT) {
                return Err(EventError::Terminated);
            }

            match filter {
                Some(name) if !event.is(name) => {
                    trace!(
                        device_id = %self.device_id,
                        event = event.name(),
                        filter = name,
                        "Discarding event not matching filter"
                    );
                },
                _ => return Ok(event),
            }
        }
    }

    /// Take the next queued event without waiting or filtering.
    pub fn try_pull(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }
}
