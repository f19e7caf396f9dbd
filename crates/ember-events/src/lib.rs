//! Ember Events - Per-device event queues.
//!
//! Every device owns one ordered event queue. Host code (capabilities, the
//! task bridge, peripherals) pushes events through a cloneable
//! [`EventQueue`]; the device's script worker consumes them through the
//! single [`EventStream`] with a blocking, filtered pull. Pulling is the only
//! cooperative suspension point of a guest script.
//!
//! # Example
//!
//! ```rust
//! use ember_core::{DeviceId, Value};
//!
//! # async fn example() {
//! let (queue, mut stream) = ember_events::channel(DeviceId::new(0), 16);
//!
//! queue.queue_event("timer", vec![Value::from(1)]);
//! let event = stream.pull(Some("timer")).await.unwrap();
//! assert_eq!(event.name(), "timer");
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod queue;

pub use error::{EventError, EventResult};
pub use queue::{DEFAULT_QUEUE_CAPACITY, EventQueue, EventStream, TERMINATE_EVENT, channel};
