use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::namespace::{FileSystem, SharedFileSystem};
use crate::{Mount, VfsError, VfsResult, WritableMount};

/// Arbitrates mount locations for one session on a device.
///
/// Several sessions (the device itself, attached peripherals) may share the
/// same namespace; each keeps its own set of owned locations and may only
/// release what it acquired. Every allocation and release runs while holding
/// the namespace's lock, so concurrent capability calls on one device cannot
/// race on the free-location check.
pub struct ResourceManager {
    fs: SharedFileSystem,
    owned: Mutex<HashSet<String>>,
}

impl ResourceManager {
    /// Create a session over a shared namespace.
    #[must_use]
    pub fn new(fs: SharedFileSystem) -> Self {
        Self {
            fs,
            owned: Mutex::new(HashSet::new()),
        }
    }

    /// The namespace this session allocates in.
    #[must_use]
    pub fn filesystem(&self) -> &SharedFileSystem {
        &self.fs
    }

    /// Bind a read-only store at `desired`, using the location as drive name.
    ///
    /// Returns the allocated location, or `None` if it is already occupied.
    pub fn mount(&self, desired: &str, store: Arc<dyn Mount>) -> Option<String> {
        self.mount_named(desired, store, desired)
    }

    /// Bind a read-only store at `desired` under an explicit drive name.
    pub fn mount_named(&self, desired: &str, store: Arc<dyn Mount>, drive: &str) -> Option<String> {
        self.allocate(desired, |fs, location| fs.mount(drive, location, store))
    }

    /// Bind a writable store at `desired`, using the location as drive name.
    ///
    /// Returns the allocated location, or `None` if it is already occupied.
    pub fn mount_writable(&self, desired: &str, store: Arc<dyn WritableMount>) -> Option<String> {
        self.mount_writable_named(desired, store, desired)
    }

    /// Bind a writable store at `desired` under an explicit drive name.
    pub fn mount_writable_named(
        &self,
        desired: &str,
        store: Arc<dyn WritableMount>,
        drive: &str,
    ) -> Option<String> {
        self.allocate(desired, |fs, location| {
            fs.mount_writable(drive, location, store)
        })
    }

    /// Release a location previously returned by one of the mount methods.
    ///
    /// `None` is accepted and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::ProtocolViolation`] if this session does not own
    /// the location, or the namespace's error if the unbind fails (the
    /// location then stays owned).
    pub fn unmount(&self, location: Option<&str>) -> VfsResult<()> {
        let Some(location) = location else {
            return Ok(());
        };

        let mut fs = self.fs.lock().unwrap_or_else(PoisonError::into_inner);
        let mut owned = self.owned.lock().unwrap_or_else(PoisonError::into_inner);
        if !owned.contains(location) {
            return Err(VfsError::ProtocolViolation(location.to_owned()));
        }

        fs.unmount(location)?;
        owned.remove(location);
        debug!(location, "Released mount");
        Ok(())
    }

    /// Whether this session owns `location`.
    #[must_use]
    pub fn owns(&self, location: &str) -> bool {
        self.owned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(location)
    }

    /// All locations owned by this session.
    #[must_use]
    pub fn owned_locations(&self) -> Vec<String> {
        let mut locations: Vec<String> = self
            .owned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        locations.sort_unstable();
        locations
    }

    /// Release every owned location, logging failures.
    pub fn unmount_all(&self) {
        for location in self.owned_locations() {
            if let Err(e) = self.unmount(Some(&location)) {
                warn!(location = %location, error = %e, "Failed to release mount");
            }
        }
    }

    fn allocate(
        &self,
        desired: &str,
        bind: impl FnOnce(&mut dyn FileSystem, &str) -> VfsResult<()>,
    ) -> Option<String> {
        let mut fs = self.fs.lock().unwrap_or_else(PoisonError::into_inner);
        let location = find_free_location(&*fs, desired)?;

        // Ownership is recorded even when the bind itself fails, so the
        // session can still release the location later.
        if let Err(e) = bind(&mut *fs, &location) {
            warn!(location = %location, error = %e, "Mount bind failed");
        }

        self.owned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(location.clone());
        debug!(location = %location, "Acquired mount");
        Some(location)
    }
}

fn find_free_location(fs: &dyn FileSystem, desired: &str) -> Option<String> {
    match fs.exists(desired) {
        Ok(false) => Some(desired.to_owned()),
        Ok(true) => None,
        Err(e) => {
            debug!(location = desired, error = %e, "Cannot check mount location");
            None
        },
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("owned", &self.owned_locations())
            .finish_non_exhaustive()
    }
}
