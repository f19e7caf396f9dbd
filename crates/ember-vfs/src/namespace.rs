use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::path::{escapes_root, sanitize, strip_location};
use crate::{Mount, VfsError, VfsResult, WritableMount};

/// A device's filesystem namespace.
///
/// Every operation is individually fallible. Implementations are not
/// required to be internally synchronised: callers share them as a
/// [`SharedFileSystem`] and hold its lock for the whole of a compound
/// operation.
pub trait FileSystem: Send {
    /// Check whether a path exists anywhere in the namespace.
    fn exists(&self, path: &str) -> VfsResult<bool>;

    /// Bind a read-only store at `location` under the drive name `drive`.
    fn mount(&mut self, drive: &str, location: &str, store: Arc<dyn Mount>) -> VfsResult<()>;

    /// Bind a writable store at `location` under the drive name `drive`.
    fn mount_writable(
        &mut self,
        drive: &str,
        location: &str,
        store: Arc<dyn WritableMount>,
    ) -> VfsResult<()>;

    /// Remove the binding at `location`, if any.
    fn unmount(&mut self, location: &str) -> VfsResult<()>;
}

/// A filesystem namespace guarded by the device's single filesystem lock.
pub type SharedFileSystem = Arc<Mutex<dyn FileSystem>>;

/// Wrap a namespace so it can be shared between the sessions of one device.
pub fn shared(fs: impl FileSystem + 'static) -> SharedFileSystem {
    Arc::new(Mutex::new(fs))
}

/// The backing store referenced by a mount record.
#[derive(Clone)]
pub enum MountStore {
    /// A read-only store.
    ReadOnly(Arc<dyn Mount>),
    /// A writable store.
    Writable(Arc<dyn WritableMount>),
}

impl MountStore {
    fn exists(&self, path: &str) -> VfsResult<bool> {
        match self {
            Self::ReadOnly(store) => store.exists(path),
            Self::Writable(store) => store.exists(path),
        }
    }
}

impl fmt::Debug for MountStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly(_) => f.write_str("MountStore::ReadOnly"),
            Self::Writable(_) => f.write_str("MountStore::Writable"),
        }
    }
}

/// One binding in a namespace. Locations are unique within a namespace.
#[derive(Debug, Clone)]
pub struct MountRecord {
    /// Normalised location of the binding.
    pub location: String,
    /// Drive name reported for paths under this binding.
    pub drive: String,
    /// The bound store.
    pub store: MountStore,
}

impl MountRecord {
    /// Whether the bound store accepts writes.
    #[must_use]
    pub fn writable(&self) -> bool {
        matches!(self.store, MountStore::Writable(_))
    }
}

/// In-memory filesystem namespace.
///
/// Paths resolve to the binding with the longest matching location; a
/// binding at the empty location acts as the root.
#[derive(Debug, Default)]
pub struct MountTable {
    mounts: HashMap<String, MountRecord>,
}

impl MountTable {
    /// Create an empty namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a namespace with a writable root store.
    #[must_use]
    pub fn with_root(root: Arc<dyn WritableMount>) -> Self {
        let mut table = Self::new();
        table.insert("hdd", String::new(), MountStore::Writable(root));
        table
    }

    /// Look up the binding at exactly `location`.
    #[must_use]
    pub fn record(&self, location: &str) -> Option<&MountRecord> {
        self.mounts.get(&sanitize(location))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    /// Whether the namespace has no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Drive name of the binding that serves `path`.
    #[must_use]
    pub fn drive(&self, path: &str) -> Option<&str> {
        self.resolve_binding(&sanitize(path))
            .map(|(record, _)| record.drive.as_str())
    }

    fn resolve_binding<'a>(&self, path: &'a str) -> Option<(&MountRecord, &'a str)> {
        self.mounts
            .values()
            .filter_map(|record| strip_location(path, &record.location).map(|rest| (record, rest)))
            .max_by_key(|(record, _)| record.location.len())
    }

    fn insert(&mut self, drive: &str, location: String, store: MountStore) {
        debug!(location = %location, drive, "Binding store");
        self.mounts.insert(
            location.clone(),
            MountRecord {
                location,
                drive: drive.to_owned(),
                store,
            },
        );
    }

    fn checked_location(location: &str) -> VfsResult<String> {
        let location = sanitize(location);
        if escapes_root(&location) {
            return Err(VfsError::MountFailed {
                location,
                reason: "Cannot mount below the root".into(),
            });
        }
        Ok(location)
    }
}

impl FileSystem for MountTable {
    fn exists(&self, path: &str) -> VfsResult<bool> {
        let path = sanitize(path);
        if escapes_root(&path) {
            return Err(VfsError::InvalidPath(path));
        }
        match self.resolve_binding(&path) {
            Some((record, rest)) => record.store.exists(rest),
            None => Ok(false),
        }
    }

    fn mount(&mut self, drive: &str, location: &str, store: Arc<dyn Mount>) -> VfsResult<()> {
        let location = Self::checked_location(location)?;
        self.insert(drive, location, MountStore::ReadOnly(store));
        Ok(())
    }

    fn mount_writable(
        &mut self,
        drive: &str,
        location: &str,
        store: Arc<dyn WritableMount>,
    ) -> VfsResult<()> {
        let location = Self::checked_location(location)?;
        self.insert(drive, location, MountStore::Writable(store));
        Ok(())
    }

    fn unmount(&mut self, location: &str) -> VfsResult<()> {
        let location = sanitize(location);
        if self.mounts.remove(&location).is_some() {
            debug!(location = %location, "Unbound store");
        }
        Ok(())
    }
}
