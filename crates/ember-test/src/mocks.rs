//! Mock implementations for testing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use ember_core::{DeviceId, Value};
use ember_runtime::{
    ApiAdapter, Capability, CapabilityFactory, DeviceAccess, GuestRuntime, MethodDescriptor,
    RuntimeError, RuntimeFactory, RuntimeResult, ScriptContext,
};
use ember_vfs::{
    FileSystem, MemoryMount, Mount, MountTable, VfsError, VfsResult, WritableMount,
};

/// Shared record of lifecycle calls made on mock capabilities.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    /// Snapshot of every entry so far.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Mock capability with three methods:
///
/// | index | name    | behaviour                                              |
/// |-------|---------|--------------------------------------------------------|
/// | 0     | `echo`  | returns its arguments                                  |
/// | 1     | `sleep` | sleeps for `args[0]` ticks through the task bridge     |
/// | 2     | `fail`  | raises a scripting error carrying `args[0]`            |
///
/// `sleep` needs the device access facade; without one it raises an error.
pub struct MockCapability {
    access: Option<Arc<DeviceAccess>>,
    log: CallLog,
    non_yielding: HashSet<usize>,
}

impl MockCapability {
    /// Create a capability not bound to a device.
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            access: None,
            log,
            non_yielding: HashSet::new(),
        }
    }

    /// Create a capability bound to a device.
    #[must_use]
    pub fn for_device(access: Arc<DeviceAccess>, log: CallLog) -> Self {
        Self {
            access: Some(access),
            ..Self::new(log)
        }
    }

    /// Declare that `method` never yields. Enables the method descriptor.
    #[must_use]
    pub fn with_non_yielding(mut self, method: usize) -> Self {
        self.non_yielding.insert(method);
        self
    }
}

#[async_trait]
impl Capability for MockCapability {
    fn method_names(&self) -> Vec<String> {
        vec!["echo".into(), "sleep".into(), "fail".into()]
    }

    fn startup(&self) {
        self.log.push("startup");
    }

    fn advance(&self, dt: Duration) {
        self.log.push(format!("advance:{}", dt.as_millis()));
    }

    fn shutdown(&self) {
        self.log.push("shutdown");
    }

    async fn call_method(
        &self,
        ctx: &mut dyn ScriptContext,
        method: usize,
        args: Vec<Value>,
    ) -> RuntimeResult<Vec<Value>> {
        match method {
            0 => Ok(args),
            1 => {
                let access = self
                    .access
                    .as_ref()
                    .ok_or_else(|| RuntimeError::Script("not attached".into()))?;
                let ticks = args
                    .first()
                    .and_then(Value::as_integer)
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(0);
                access.tasks().sleep(access.events(), ctx, ticks).await?;
                Ok(Vec::new())
            },
            _ => Err(RuntimeError::Script(
                args.first()
                    .and_then(Value::as_str)
                    .unwrap_or("failed")
                    .to_owned(),
            )),
        }
    }

    fn as_method_descriptor(&self) -> Option<&dyn MethodDescriptor> {
        if self.non_yielding.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl MethodDescriptor for MockCapability {
    fn may_yield(&self, method: usize) -> bool {
        !self.non_yielding.contains(&method)
    }
}

/// Capability factory that attaches a [`MockCapability`] to every device, or
/// declines every device.
pub struct StaticCapabilityFactory {
    names: Vec<String>,
    decline: bool,
    log: CallLog,
    created: AtomicUsize,
}

impl StaticCapabilityFactory {
    /// Factory publishing under `names`, sharing `log` between instances.
    #[must_use]
    pub fn new(names: &[&str], log: CallLog) -> Self {
        Self {
            names: names.iter().map(|n| (*n).to_owned()).collect(),
            decline: false,
            log,
            created: AtomicUsize::new(0),
        }
    }

    /// Factory that never produces a capability.
    #[must_use]
    pub fn declining(names: &[&str]) -> Self {
        Self {
            decline: true,
            ..Self::new(names, CallLog::new())
        }
    }

    /// Number of capabilities produced so far.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl CapabilityFactory for StaticCapabilityFactory {
    fn names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn create(&self, access: &Arc<DeviceAccess>) -> Option<Arc<dyn Capability>> {
        if self.decline {
            return None;
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Some(Arc::new(MockCapability::for_device(
            Arc::clone(access),
            self.log.clone(),
        )))
    }
}

/// What a [`RecordingRuntime`] has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct RuntimeLog {
    /// Device each runtime instance was created for.
    pub devices: Vec<DeviceId>,
    /// Globals set, in order.
    pub globals: Vec<(String, Value)>,
    /// Names of every registered API, in order.
    pub apis: Vec<Vec<String>>,
    /// Number of `unload` calls.
    pub unloads: usize,
}

impl RuntimeLog {
    /// Last value set for global `name`.
    #[must_use]
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// Guest runtime that records calls into a shared [`RuntimeLog`].
pub struct RecordingRuntime {
    log: Arc<Mutex<RuntimeLog>>,
}

impl GuestRuntime for RecordingRuntime {
    fn set_global(&mut self, name: &str, value: Value) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .globals
            .push((name.to_owned(), value));
    }

    fn register_api(&mut self, api: Arc<ApiAdapter>) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apis
            .push(api.names().to_vec());
    }

    fn unload(&mut self) {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.unloads = log.unloads.saturating_add(1);
    }
}

/// Runtime backend producing [`RecordingRuntime`]s.
pub struct MockRuntimeFactory {
    id: String,
    pre_bios: Option<String>,
    fail: bool,
    log: Arc<Mutex<RuntimeLog>>,
}

impl MockRuntimeFactory {
    /// Backend with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pre_bios: None,
            fail: false,
            log: Arc::new(Mutex::new(RuntimeLog::default())),
        }
    }

    /// Set the pre-BIOS path.
    #[must_use]
    pub fn with_pre_bios(mut self, path: impl Into<String>) -> Self {
        self.pre_bios = Some(path.into());
        self
    }

    /// Make `create` fail.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Snapshot of everything the produced runtimes recorded.
    #[must_use]
    pub fn log(&self) -> RuntimeLog {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RuntimeFactory for MockRuntimeFactory {
    fn id(&self) -> &str {
        &self.id
    }

    fn pre_bios(&self) -> Option<&str> {
        self.pre_bios.as_deref()
    }

    fn create(&self, access: &Arc<DeviceAccess>) -> RuntimeResult<Box<dyn GuestRuntime>> {
        if self.fail {
            return Err(RuntimeError::Configuration(format!(
                "backend '{}' unavailable",
                self.id
            )));
        }
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .devices
            .push(access.id());
        Ok(Box::new(RecordingRuntime {
            log: Arc::clone(&self.log),
        }))
    }
}

/// Namespace whose binds or unbinds can be made to fail.
pub struct FaultyFileSystem {
    inner: MountTable,
    fail_binds: bool,
    fail_unbinds: bool,
}

impl FaultyFileSystem {
    /// Wrap a working namespace.
    #[must_use]
    pub fn new(inner: MountTable) -> Self {
        Self {
            inner,
            fail_binds: false,
            fail_unbinds: false,
        }
    }

    /// Make every `mount`/`mount_writable` fail.
    #[must_use]
    pub fn failing_binds(mut self) -> Self {
        self.fail_binds = true;
        self
    }

    /// Make every `unmount` fail.
    #[must_use]
    pub fn failing_unbinds(mut self) -> Self {
        self.fail_unbinds = true;
        self
    }

    fn refuse(location: &str) -> VfsError {
        VfsError::MountFailed {
            location: location.to_owned(),
            reason: "injected fault".into(),
        }
    }
}

impl FileSystem for FaultyFileSystem {
    fn exists(&self, path: &str) -> VfsResult<bool> {
        self.inner.exists(path)
    }

    fn mount(&mut self, drive: &str, location: &str, store: Arc<dyn Mount>) -> VfsResult<()> {
        if self.fail_binds {
            return Err(Self::refuse(location));
        }
        self.inner.mount(drive, location, store)
    }

    fn mount_writable(
        &mut self,
        drive: &str,
        location: &str,
        store: Arc<dyn WritableMount>,
    ) -> VfsResult<()> {
        if self.fail_binds {
            return Err(Self::refuse(location));
        }
        self.inner.mount_writable(drive, location, store)
    }

    fn unmount(&mut self, location: &str) -> VfsResult<()> {
        if self.fail_unbinds {
            return Err(Self::refuse(location));
        }
        self.inner.unmount(location)
    }
}

/// In-memory store that reports a host directory, like a directory-backed
/// root would.
pub struct HostBackedMount {
    inner: MemoryMount,
    path: PathBuf,
}

impl HostBackedMount {
    /// Store of `capacity` bytes reporting `path` as its host directory.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, capacity: u64) -> Self {
        Self {
            inner: MemoryMount::new(capacity),
            path: path.into(),
        }
    }
}

impl Mount for HostBackedMount {
    fn exists(&self, path: &str) -> VfsResult<bool> {
        self.inner.exists(path)
    }
    fn is_directory(&self, path: &str) -> VfsResult<bool> {
        self.inner.is_directory(path)
    }
    fn list(&self, path: &str) -> VfsResult<Vec<String>> {
        self.inner.list(path)
    }
    fn size(&self, path: &str) -> VfsResult<u64> {
        self.inner.size(path)
    }
    fn read(&self, path: &str) -> VfsResult<Vec<u8>> {
        self.inner.read(path)
    }
    fn host_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

impl WritableMount for HostBackedMount {
    fn make_directory(&self, path: &str) -> VfsResult<()> {
        self.inner.make_directory(path)
    }
    fn delete(&self, path: &str) -> VfsResult<()> {
        self.inner.delete(path)
    }
    fn write(&self, path: &str, contents: &[u8], append: bool) -> VfsResult<()> {
        self.inner.write(path, contents, append)
    }
    fn remaining_space(&self) -> u64 {
        self.inner.remaining_space()
    }
}
