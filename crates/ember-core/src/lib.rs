//! Ember Core - Foundation types shared by every Ember crate.
//!
//! This crate provides:
//! - [`Value`]: the dynamically typed values exchanged with guest scripts
//! - [`Event`]: a named event carrying guest values, as queued on a device
//! - Identifier newtypes for devices and asynchronous tasks

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod event;
pub mod types;
pub mod value;

pub use event::Event;
pub use types::{DeviceId, TaskId};
pub use value::Value;
