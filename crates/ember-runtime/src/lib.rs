//! Ember Runtime - host-side coordination for scripted virtual devices.
//!
//! This crate provides:
//! - [`TaskBridge`]: asynchronous host tasks correlated back to the issuing
//!   script through `task_complete` events
//! - [`RuntimeRegistry`]: pluggable runtime backends and capability factories
//! - [`ApiAdapter`]: the lifecycle/dispatch wrapper around a [`Capability`]
//! - [`Device`] / [`DeviceAccess`]: device bring-up and the facade
//!   capabilities use to reach their device
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ember_core::{DeviceId, Value};
//! use ember_events::channel;
//! use ember_runtime::{TaskBridge, TaskConfig, TaskResult};
//!
//! # async fn example() -> Result<(), ember_runtime::RuntimeError> {
//! let bridge = TaskBridge::new(TaskConfig::default(), tokio::runtime::Handle::current());
//! let (queue, mut stream) = channel(DeviceId::new(1), 256);
//!
//! let task = Arc::new(|| -> TaskResult { Ok(vec![Value::from("done")]) });
//! let values = bridge.execute_task(&queue, &mut stream, task, 0).await?;
//! assert_eq!(values, vec![Value::from("done")]);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config_bridge;
pub mod prelude;

mod bridge;
mod capability;
mod device;
mod error;
mod machine;
mod registry;
mod task;

pub use bridge::{COMPLETION_EVENT, ScriptContext, TaskBridge, TaskOutcome};
pub use capability::{ApiAdapter, Capability, MethodDescriptor};
pub use device::{Device, DeviceAccess};
pub use error::{GENERIC_TASK_FAILURE, RuntimeError, RuntimeResult};
pub use machine::{
    GLOBAL_DEFAULT_SETTINGS, GLOBAL_DISABLE_LEGACY_FEATURES, GLOBAL_HOST, GLOBAL_RUNTIME,
    GuestRuntime, MachineSettings,
};
pub use registry::{CapabilityFactory, RuntimeFactory, RuntimeRegistry};
pub use task::{Task, TaskConfig, TaskError, TaskResult};
