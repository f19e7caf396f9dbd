//! Prelude module - commonly used types for convenient import.
//!
//! Use `use ember_runtime::prelude::*;` to import all essential types.

// Errors
pub use crate::{RuntimeError, RuntimeResult};

// Tasks
pub use crate::{COMPLETION_EVENT, ScriptContext, Task, TaskBridge, TaskConfig, TaskError, TaskOutcome, TaskResult};

// Capabilities and backends
pub use crate::{ApiAdapter, Capability, CapabilityFactory, MethodDescriptor, RuntimeFactory, RuntimeRegistry};

// Devices
pub use crate::{Device, DeviceAccess, GuestRuntime, MachineSettings};
