//! Test fixtures wiring mocks into devices.

use std::sync::Arc;

use ember_core::DeviceId;
use ember_events::{EventStream, channel};
use ember_runtime::{DeviceAccess, RuntimeRegistry, TaskBridge, TaskConfig};
use ember_vfs::{MemoryMount, MountTable, SharedFileSystem, shared};

use crate::mocks::MockRuntimeFactory;

/// Event queue capacity used by test devices.
pub const TEST_QUEUE_CAPACITY: usize = 64;

/// Create a task bridge on the current tokio runtime with default limits.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
#[must_use]
pub fn test_task_bridge() -> TaskBridge {
    TaskBridge::new(TaskConfig::default(), tokio::runtime::Handle::current())
}

/// Create a task bridge on the current tokio runtime with a table limit.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
#[must_use]
pub fn test_task_bridge_with(max_pending: usize) -> TaskBridge {
    TaskBridge::new(
        TaskConfig {
            max_pending,
            ..TaskConfig::default()
        },
        tokio::runtime::Handle::current(),
    )
}

/// Create a namespace with a 64 KiB in-memory root holding a `startup` file.
#[must_use]
pub fn test_namespace() -> (SharedFileSystem, Arc<MemoryMount>) {
    let root = Arc::new(MemoryMount::new(65_536).with_file("startup", "print('hello')"));
    let fs = shared(MountTable::with_root(root.clone()));
    (fs, root)
}

/// Create the access facade and event stream of device `id` on a fresh
/// namespace.
#[must_use]
pub fn test_device_access(id: u32, bridge: &TaskBridge) -> (DeviceAccess, EventStream) {
    let (fs, root) = test_namespace();
    let (queue, stream) = channel(DeviceId::new(id), TEST_QUEUE_CAPACITY);
    let access = DeviceAccess::new(queue, fs, bridge.clone())
        .with_label(format!("computer_{id}"))
        .with_root(root);
    (access, stream)
}

/// Create a registry with a [`MockRuntimeFactory`] for each id.
#[must_use]
pub fn test_registry(ids: &[&str]) -> RuntimeRegistry {
    let mut registry = RuntimeRegistry::new();
    for id in ids {
        registry.register_runtime(Arc::new(MockRuntimeFactory::new(*id)));
    }
    registry
}
