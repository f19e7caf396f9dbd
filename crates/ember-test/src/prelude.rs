//! Prelude module - commonly used test utilities.

pub use crate::{
    CallLog, FaultyFileSystem, HostBackedMount, MockCapability, MockRuntimeFactory,
    RecordingRuntime, RuntimeLog, StaticCapabilityFactory,
};

pub use crate::{
    setup_test_logging, test_device_access, test_namespace, test_registry, test_task_bridge,
    test_task_bridge_with,
};
