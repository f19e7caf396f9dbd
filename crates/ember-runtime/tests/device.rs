//! Device bring-up, lifecycle and mount arbitration through the facade.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ember_core::{DeviceId, Value};
use ember_events::channel;
use ember_runtime::{
    Device, DeviceAccess, GLOBAL_DEFAULT_SETTINGS, GLOBAL_DISABLE_LEGACY_FEATURES, GLOBAL_HOST,
    GLOBAL_RUNTIME, MachineSettings, RuntimeError, RuntimeRegistry,
};
use ember_test::{
    CallLog, FaultyFileSystem, HostBackedMount, MockRuntimeFactory, StaticCapabilityFactory,
    test_device_access, test_registry, test_task_bridge,
};
use ember_vfs::{MemoryMount, MountTable, VfsError, shared};

fn settings(runtime: &str, default: &str) -> MachineSettings {
    MachineSettings {
        runtime_id: runtime.into(),
        default_runtime_id: default.into(),
        host: "ember-test".into(),
        default_settings: "bios.use_multishell=false".into(),
        disable_legacy_features: false,
    }
}

#[tokio::test]
async fn test_create_installs_globals_and_apis() {
    let bridge = test_task_bridge();
    let (access, stream) = test_device_access(1, &bridge);
    let backend = Arc::new(MockRuntimeFactory::new("fast"));
    let log = CallLog::new();

    let mut registry = RuntimeRegistry::new();
    registry.register_runtime(backend.clone());
    registry.register_capability(Arc::new(StaticCapabilityFactory::new(&["os"], log.clone())));
    registry.register_capability(Arc::new(StaticCapabilityFactory::declining(&["http"])));
    registry.register_capability(Arc::new(StaticCapabilityFactory::new(
        &["fs", "filesystem"],
        log,
    )));

    let device = Device::create(&registry, &settings("fast", "fast"), access, stream).unwrap();
    assert_eq!(device.id(), DeviceId::new(1));
    assert_eq!(device.runtime_id(), "fast");
    assert_eq!(device.adapters().len(), 2);

    let recorded = backend.log();
    assert_eq!(recorded.devices, vec![DeviceId::new(1)]);
    assert_eq!(recorded.global(GLOBAL_HOST), Some(&Value::from("ember-test")));
    assert_eq!(
        recorded.global(GLOBAL_DEFAULT_SETTINGS),
        Some(&Value::from("bios.use_multishell=false"))
    );
    assert_eq!(recorded.global(GLOBAL_RUNTIME), Some(&Value::from("fast")));
    assert_eq!(recorded.global(GLOBAL_DISABLE_LEGACY_FEATURES), None);
    assert_eq!(
        recorded.apis,
        vec![
            vec!["os".to_string()],
            vec!["fs".to_string(), "filesystem".to_string()]
        ]
    );
}

#[tokio::test]
async fn test_duplicate_capability_factories_both_attach() {
    let bridge = test_task_bridge();
    let (access, stream) = test_device_access(1, &bridge);
    let factory = Arc::new(StaticCapabilityFactory::new(&["os"], CallLog::new()));

    let mut registry = test_registry(&["safe"]);
    registry.register_capability(factory.clone());
    registry.register_capability(factory.clone());

    let device = Device::create(&registry, &settings("safe", "safe"), access, stream).unwrap();
    assert_eq!(device.adapters().len(), 2);
    assert_eq!(factory.created(), 2);
}

#[tokio::test]
async fn test_create_falls_back_to_default_backend() {
    let bridge = test_task_bridge();
    let (access, stream) = test_device_access(2, &bridge);
    let safe = Arc::new(MockRuntimeFactory::new("safe"));
    let mut registry = test_registry(&["fast"]);
    registry.register_runtime(safe.clone());

    let device = Device::create(
        &registry,
        &MachineSettings {
            disable_legacy_features: true,
            ..settings("missing", "safe")
        },
        access,
        stream,
    )
    .unwrap();
    assert_eq!(device.runtime_id(), "safe");
    let recorded = safe.log();
    assert_eq!(recorded.global(GLOBAL_RUNTIME), Some(&Value::from("safe")));
    assert_eq!(
        recorded.global(GLOBAL_DISABLE_LEGACY_FEATURES),
        Some(&Value::Boolean(true))
    );
}

#[tokio::test]
async fn test_create_without_backend_is_configuration_error() {
    let bridge = test_task_bridge();
    let (access, stream) = test_device_access(3, &bridge);
    let registry = test_registry(&["fast"]);

    let err = Device::create(&registry, &settings("missing", "safe"), access, stream).unwrap_err();
    assert!(matches!(err, RuntimeError::Configuration(_)));
    assert!(!err.is_script_visible());
}

#[tokio::test]
async fn test_failing_backend_aborts_bring_up() {
    let bridge = test_task_bridge();
    let (access, stream) = test_device_access(3, &bridge);
    let mut registry = RuntimeRegistry::new();
    registry.register_runtime(Arc::new(MockRuntimeFactory::new("fast").failing()));

    assert!(Device::create(&registry, &settings("fast", "fast"), access, stream).is_err());
}

#[tokio::test]
async fn test_mismatched_stream_rejected() {
    let bridge = test_task_bridge();
    let (access, _stream) = test_device_access(1, &bridge);
    let (_queue, other_stream) = channel(DeviceId::new(9), 4);
    let registry = test_registry(&["safe"]);

    let err = Device::create(&registry, &settings("safe", "safe"), access, other_stream)
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Configuration(_)));
}

#[tokio::test]
async fn test_lifecycle_forwarded_and_shutdown_unloads() {
    let bridge = test_task_bridge();
    let (access, stream) = test_device_access(5, &bridge);
    let backend = Arc::new(MockRuntimeFactory::new("safe"));
    let log = CallLog::new();
    let mut registry = RuntimeRegistry::new();
    registry.register_runtime(backend.clone());
    registry.register_capability(Arc::new(StaticCapabilityFactory::new(&["os"], log.clone())));

    let mut device = Device::create(&registry, &settings("safe", "safe"), access, stream).unwrap();
    let interrupt = device.interrupt_token();
    let stream = device.take_event_stream().unwrap();
    assert!(device.take_event_stream().is_none());

    device.startup();
    device.advance(Duration::from_millis(50));
    assert!(!stream.is_interrupted());

    device.shutdown();
    device.shutdown();
    assert!(interrupt.is_cancelled());
    assert!(stream.is_interrupted());
    assert_eq!(log.entries(), vec!["startup", "advance:50", "shutdown"]);
    assert_eq!(backend.log().unloads, 1);
}

#[tokio::test]
async fn test_abort_only_interrupts() {
    let bridge = test_task_bridge();
    let (access, stream) = test_device_access(6, &bridge);
    let backend = Arc::new(MockRuntimeFactory::new("safe"));
    let log = CallLog::new();
    let mut registry = RuntimeRegistry::new();
    registry.register_runtime(backend.clone());
    registry.register_capability(Arc::new(StaticCapabilityFactory::new(&["os"], log.clone())));

    let device = Device::create(&registry, &settings("safe", "safe"), access, stream).unwrap();
    device.abort();
    assert!(device.interrupt_token().is_cancelled());
    assert!(log.entries().is_empty());
    assert_eq!(backend.log().unloads, 0);
}

#[tokio::test]
async fn test_access_facade_mounts() {
    let bridge = test_task_bridge();
    let (access, _stream) = test_device_access(7, &bridge);
    assert_eq!(access.label(), "computer_7");

    let disk = Arc::new(MemoryMount::new(128));
    assert_eq!(access.mount_writable_named("disk", disk, "left"), Some("disk".into()));
    assert_eq!(access.mount("startup", Arc::new(MemoryMount::new(0))), None);
    assert_eq!(access.mount("disk", Arc::new(MemoryMount::new(0))), None);
    assert!(access.resources().owns("disk"));

    access.unmount(Some("disk")).unwrap();
    access.unmount(None).unwrap();
    assert!(matches!(
        access.unmount(Some("disk")),
        Err(RuntimeError::ProtocolViolation(_))
    ));
}

#[tokio::test]
async fn test_sessions_cannot_release_each_others_mounts() {
    let bridge = test_task_bridge();
    let fs = shared(MountTable::with_root(Arc::new(MemoryMount::new(1024))));
    let (queue, _stream) = channel(DeviceId::new(8), 4);
    let device = DeviceAccess::new(queue.clone(), fs.clone(), bridge.clone());
    let peripheral = DeviceAccess::new(queue, fs.clone(), bridge);

    device.mount("rom", Arc::new(MemoryMount::new(0))).unwrap();
    let err = peripheral.unmount(Some("rom")).unwrap_err();
    assert_eq!(
        err,
        RuntimeError::ProtocolViolation("You didn't mount this location: rom".into())
    );
    assert!(fs.lock().unwrap().exists("rom").unwrap());
}

#[tokio::test]
async fn test_failed_bind_still_owned() {
    let bridge = test_task_bridge();
    let fs = shared(
        FaultyFileSystem::new(MountTable::with_root(Arc::new(MemoryMount::new(1024))))
            .failing_binds(),
    );
    let (queue, _stream) = channel(DeviceId::new(9), 4);
    let access = DeviceAccess::new(queue, fs.clone(), bridge);

    assert_eq!(access.mount("disk", Arc::new(MemoryMount::new(0))), Some("disk".into()));
    assert!(!fs.lock().unwrap().exists("disk").unwrap());
    assert!(access.resources().owns("disk"));
    access.unmount(Some("disk")).unwrap();
}

#[tokio::test]
async fn test_failed_unbind_keeps_ownership() {
    let bridge = test_task_bridge();
    let fs = shared(
        FaultyFileSystem::new(MountTable::with_root(Arc::new(MemoryMount::new(1024))))
            .failing_unbinds(),
    );
    let (queue, _stream) = channel(DeviceId::new(10), 4);
    let access = DeviceAccess::new(queue, fs, bridge);

    access.mount("disk", Arc::new(MemoryMount::new(0))).unwrap();
    assert!(matches!(
        access.unmount(Some("disk")),
        Err(RuntimeError::Vfs(VfsError::MountFailed { .. }))
    ));
    assert!(access.resources().owns("disk"));
}

#[tokio::test]
async fn test_root_path_from_host_backed_root() {
    let bridge = test_task_bridge();
    let (access, _stream) = test_device_access(11, &bridge);
    assert!(access.root_mount().is_some());
    assert_eq!(access.root_path(), None);

    let (queue, _stream) = channel(DeviceId::new(12), 4);
    let root = Arc::new(HostBackedMount::new("/srv/ember/computer/12", 1024));
    let access = DeviceAccess::new(queue, shared(MountTable::with_root(root.clone())), bridge)
        .with_root(root);
    assert_eq!(access.root_path(), Some(Path::new("/srv/ember/computer/12")));
    assert!(access.queue_event("disk", vec![Value::from("left")]));
}
