//! Devices and the access facade handed to capabilities.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ember_core::{DeviceId, Value};
use ember_events::{EventQueue, EventStream};
use ember_vfs::{Mount, ResourceManager, SharedFileSystem, WritableMount};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::bridge::TaskBridge;
use crate::capability::ApiAdapter;
use crate::error::{RuntimeError, RuntimeResult};
use crate::machine::{GuestRuntime, MachineSettings};
use crate::registry::RuntimeRegistry;

/// What a capability may do to the device it is attached to.
pub struct DeviceAccess {
    id: DeviceId,
    label: String,
    events: EventQueue,
    resources: ResourceManager,
    root: Option<Arc<dyn WritableMount>>,
    tasks: TaskBridge,
}

impl DeviceAccess {
    /// Create the facade for device `events.device_id()`, allocating mounts in
    /// `fs`.
    #[must_use]
    pub fn new(events: EventQueue, fs: SharedFileSystem, tasks: TaskBridge) -> Self {
        Self {
            id: events.device_id(),
            label: String::new(),
            events,
            resources: ResourceManager::new(fs),
            root: None,
            tasks,
        }
    }

    /// Set the attachment name reported to capabilities.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Record the device's root store.
    #[must_use]
    pub fn with_root(mut self, root: Arc<dyn WritableMount>) -> Self {
        self.root = Some(root);
        self
    }

    /// The device id.
    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// The attachment name.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Queue an event for the device's script. Returns `false` if dropped.
    pub fn queue_event(&self, name: impl Into<String>, args: Vec<Value>) -> bool {
        self.events.queue_event(name, args)
    }

    /// The device's event queue.
    #[must_use]
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// The shared task bridge.
    #[must_use]
    pub fn tasks(&self) -> &TaskBridge {
        &self.tasks
    }

    /// This session's mount arbitration.
    #[must_use]
    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    /// See [`ResourceManager::mount`].
    pub fn mount(&self, desired: &str, store: Arc<dyn Mount>) -> Option<String> {
        self.resources.mount(desired, store)
    }

    /// See [`ResourceManager::mount_named`].
    pub fn mount_named(&self, desired: &str, store: Arc<dyn Mount>, drive: &str) -> Option<String> {
        self.resources.mount_named(desired, store, drive)
    }

    /// See [`ResourceManager::mount_writable`].
    pub fn mount_writable(&self, desired: &str, store: Arc<dyn WritableMount>) -> Option<String> {
        self.resources.mount_writable(desired, store)
    }

    /// See [`ResourceManager::mount_writable_named`].
    pub fn mount_writable_named(
        &self,
        desired: &str,
        store: Arc<dyn WritableMount>,
        drive: &str,
    ) -> Option<String> {
        self.resources.mount_writable_named(desired, store, drive)
    }

    /// Release a location this device mounted.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ProtocolViolation`] if the location was not
    /// mounted through this facade.
    pub fn unmount(&self, location: Option<&str>) -> RuntimeResult<()> {
        Ok(self.resources.unmount(location)?)
    }

    /// The root store, if one was recorded.
    #[must_use]
    pub fn root_mount(&self) -> Option<&Arc<dyn WritableMount>> {
        self.root.as_ref()
    }

    /// Host directory behind the root store, when it is directory backed.
    #[must_use]
    pub fn root_path(&self) -> Option<&Path> {
        self.root.as_deref().and_then(|root| root.host_path())
    }
}

impl std::fmt::Debug for DeviceAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceAccess")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}

/// A running device: one guest runtime plus its attached capabilities.
pub struct Device {
    access: Arc<DeviceAccess>,
    runtime: Box<dyn GuestRuntime>,
    runtime_id: String,
    adapters: Vec<Arc<ApiAdapter>>,
    stream: Option<EventStream>,
    interrupt: CancellationToken,
    stopped: bool,
}

impl Device {
    /// Bring up a device.
    ///
    /// Resolves the runtime backend, installs the machine globals and
    /// attaches every capability the registry's factories produce.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Configuration`] if no backend can be resolved
    /// or `stream` belongs to another device, and any error the backend's
    /// factory reports.
    pub fn create(
        registry: &RuntimeRegistry,
        settings: &MachineSettings,
        access: DeviceAccess,
        stream: EventStream,
    ) -> RuntimeResult<Self> {
        if stream.device_id() != access.id() {
            return Err(RuntimeError::Configuration(format!(
                "event stream of {} attached to {}",
                stream.device_id(),
                access.id()
            )));
        }

        let factory = registry.resolve_runtime(&settings.runtime_id, &settings.default_runtime_id)?;
        let access = Arc::new(access);
        let mut runtime = factory.create(&access)?;
        settings.apply(runtime.as_mut(), factory.id());

        let adapters = registry.create_adapters(&access);
        for adapter in &adapters {
            runtime.register_api(Arc::clone(adapter));
        }

        info!(
            device_id = %access.id(),
            runtime_id = factory.id(),
            apis = adapters.len(),
            "Device created"
        );

        Ok(Self {
            interrupt: stream.interrupt_token(),
            access,
            runtime,
            runtime_id: factory.id().to_owned(),
            adapters,
            stream: Some(stream),
            stopped: false,
        })
    }

    /// The device id.
    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.access.id()
    }

    /// Id of the backend the device runs on.
    #[must_use]
    pub fn runtime_id(&self) -> &str {
        &self.runtime_id
    }

    /// The device's access facade.
    #[must_use]
    pub fn access(&self) -> &Arc<DeviceAccess> {
        &self.access
    }

    /// Attached capabilities.
    #[must_use]
    pub fn adapters(&self) -> &[Arc<ApiAdapter>] {
        &self.adapters
    }

    /// Hand the event stream to the script worker. Returns `None` after the
    /// first call.
    pub fn take_event_stream(&mut self) -> Option<EventStream> {
        self.stream.take()
    }

    /// Token that interrupts the script's waits when cancelled.
    #[must_use]
    pub fn interrupt_token(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    /// Start every capability.
    pub fn startup(&self) {
        for adapter in &self.adapters {
            adapter.startup();
        }
    }

    /// Advance every capability by `dt`.
    pub fn advance(&self, dt: Duration) {
        for adapter in &self.adapters {
            adapter.advance(dt);
        }
    }

    /// Interrupt any waiting script without tearing the device down.
    pub fn abort(&self) {
        debug!(device_id = %self.id(), "Interrupting device");
        self.interrupt.cancel();
    }

    /// Interrupt the script, shut down every capability and unload the
    /// runtime. Later calls do nothing.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.interrupt.cancel();
        for adapter in &self.adapters {
            adapter.shutdown();
        }
        self.runtime.unload();
        info!(device_id = %self.id(), "Device shut down");
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id())
            .field("runtime_id", &self.runtime_id)
            .field("adapters", &self.adapters)
            .finish_non_exhaustive()
    }
}
