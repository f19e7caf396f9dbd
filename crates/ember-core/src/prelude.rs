//! Prelude module - commonly used types for convenient import.
//!
//! Use `use ember_core::prelude::*;` to import all essential types.

pub use crate::{DeviceId, Event, TaskId, Value};
