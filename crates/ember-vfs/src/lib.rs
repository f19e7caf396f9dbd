//! Ember Virtual File System (VFS).
//!
//! Each device sees a single filesystem namespace assembled from mounts:
//! backing stores bound at a location. This crate provides:
//!
//! - [`Mount`] / [`WritableMount`]: backing store traits
//! - [`FileSystem`]: the namespace boundary (`exists`, `mount`, `unmount`)
//! - [`MountTable`]: an in-memory namespace implementation
//! - [`MemoryMount`]: an in-memory writable backing store
//! - [`ResourceManager`]: per-session mount arbitration under the device's
//!   filesystem lock

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Virtual filesystem error types.
pub mod error;
/// Resource manager arbitrating mounts for one session.
pub mod manager;
/// In-memory backing store.
pub mod memory;
/// Filesystem namespace and mount records.
pub mod namespace;
/// Path normalisation utilities.
pub mod path;

pub use error::{VfsError, VfsResult};
pub use manager::ResourceManager;
pub use memory::MemoryMount;
pub use namespace::{FileSystem, MountRecord, MountStore, MountTable, SharedFileSystem, shared};

use std::path::Path;

/// A read-only backing store that can be bound into a namespace.
///
/// Paths are relative to the store root and already normalised; the empty
/// path names the root itself.
pub trait Mount: Send + Sync {
    /// Check whether a path exists in this store.
    fn exists(&self, path: &str) -> VfsResult<bool>;

    /// Check whether a path is a directory.
    fn is_directory(&self, path: &str) -> VfsResult<bool>;

    /// List the entry names of a directory.
    fn list(&self, path: &str) -> VfsResult<Vec<String>>;

    /// Size of a file in bytes.
    fn size(&self, path: &str) -> VfsResult<u64>;

    /// Read a whole file.
    fn read(&self, path: &str) -> VfsResult<Vec<u8>>;

    /// Host directory backing this store, if it is directory backed.
    fn host_path(&self) -> Option<&Path> {
        None
    }
}

/// A backing store that also accepts writes.
pub trait WritableMount: Mount {
    /// Create a directory and any missing parents.
    fn make_directory(&self, path: &str) -> VfsResult<()>;

    /// Delete a file or directory tree.
    fn delete(&self, path: &str) -> VfsResult<()>;

    /// Write a file, replacing or appending to its contents.
    fn write(&self, path: &str, contents: &[u8], append: bool) -> VfsResult<()>;

    /// Bytes still available for writing.
    fn remaining_space(&self) -> u64;
}
