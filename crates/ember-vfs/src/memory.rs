use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::path::resolve;
use crate::{Mount, VfsError, VfsResult, WritableMount};

#[derive(Debug, Clone)]
enum Entry {
    File(Vec<u8>),
    Directory,
}

/// A writable backing store held entirely in memory.
///
/// Used for scratch drives, tests and as a root store for devices whose
/// contents are not persisted. Writes are limited by a byte capacity.
#[derive(Debug)]
pub struct MemoryMount {
    entries: RwLock<BTreeMap<String, Entry>>,
    capacity: u64,
}

impl MemoryMount {
    /// Create an empty store with the given capacity in bytes.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(String::new(), Entry::Directory);
        Self {
            entries: RwLock::new(entries),
            capacity,
        }
    }

    /// Add a file, creating its parent directories.
    ///
    /// Builder-style helper for seeding read-only content; the capacity limit
    /// is not enforced.
    #[must_use]
    pub fn with_file(self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        if let Ok(path) = resolve(path) {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            insert_parents(&mut entries, &path);
            entries.insert(path, Entry::File(contents.into()));
        }
        self
    }

    fn used(entries: &BTreeMap<String, Entry>) -> u64 {
        entries
            .values()
            .map(|entry| match entry {
                Entry::File(data) => data.len() as u64,
                Entry::Directory => 0,
            })
            .fold(0u64, u64::saturating_add)
    }
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

fn insert_parents(entries: &mut BTreeMap<String, Entry>, path: &str) {
    let mut parent = parent_of(path);
    while !parent.is_empty() {
        entries
            .entry(parent.to_owned())
            .or_insert(Entry::Directory);
        parent = parent_of(parent);
    }
}

fn is_child(candidate: &str, dir: &str) -> bool {
    if dir.is_empty() {
        !candidate.is_empty()
    } else {
        candidate
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl Mount for MemoryMount {
    fn exists(&self, path: &str) -> VfsResult<bool> {
        let path = resolve(path)?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.contains_key(&path))
    }

    fn is_directory(&self, path: &str) -> VfsResult<bool> {
        let path = resolve(path)?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(matches!(entries.get(&path), Some(Entry::Directory)))
    }

    fn list(&self, path: &str) -> VfsResult<Vec<String>> {
        let path = resolve(path)?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&path) {
            Some(Entry::Directory) => {},
            Some(Entry::File(_)) => return Err(VfsError::WrongType(path)),
            None => return Err(VfsError::NotFound(path)),
        }
        Ok(entries
            .keys()
            .filter(|key| is_child(key, &path) && parent_of(key) == path)
            .map(|key| key.rsplit('/').next().unwrap_or(key).to_owned())
            .collect())
    }

    fn size(&self, path: &str) -> VfsResult<u64> {
        let path = resolve(path)?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&path) {
            Some(Entry::File(data)) => Ok(data.len() as u64),
            Some(Entry::Directory) => Ok(0),
            None => Err(VfsError::NotFound(path)),
        }
    }

    fn read(&self, path: &str) -> VfsResult<Vec<u8>> {
        let path = resolve(path)?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&path) {
            Some(Entry::File(data)) => Ok(data.clone()),
            Some(Entry::Directory) => Err(VfsError::WrongType(path)),
            None => Err(VfsError::NotFound(path)),
        }
    }
}

impl WritableMount for MemoryMount {
    fn make_directory(&self, path: &str) -> VfsResult<()> {
        let path = resolve(path)?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(Entry::File(_)) = entries.get(&path) {
            return Err(VfsError::WrongType(path));
        }
        insert_parents(&mut entries, &path);
        entries.insert(path, Entry::Directory);
        Ok(())
    }

    fn delete(&self, path: &str) -> VfsResult<()> {
        let path = resolve(path)?;
        if path.is_empty() {
            return Err(VfsError::InvalidPath("cannot delete the store root".into()));
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|key, _| *key != path && !is_child(key, &path));
        Ok(())
    }

    fn write(&self, path: &str, contents: &[u8], append: bool) -> VfsResult<()> {
        let path = resolve(path)?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        let existing = match entries.get(&path) {
            Some(Entry::Directory) => return Err(VfsError::WrongType(path)),
            Some(Entry::File(data)) => data.len() as u64,
            None => 0,
        };
        let freed = if append { 0 } else { existing };
        let used = Self::used(&entries).saturating_sub(freed);
        if used.saturating_add(contents.len() as u64) > self.capacity {
            return Err(VfsError::OutOfSpace);
        }

        insert_parents(&mut entries, &path);
        match entries.get_mut(&path) {
            Some(Entry::File(data)) if append => data.extend_from_slice(contents),
            _ => {
                entries.insert(path, Entry::File(contents.to_vec()));
            },
        }
        Ok(())
    }

    fn remaining_space(&self) -> u64 {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        self.capacity.saturating_sub(Self::used(&entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_exists() {
        let mount = MemoryMount::new(1024);
        assert!(mount.exists("").unwrap());
        assert!(mount.is_directory("").unwrap());
        assert!(mount.list("").unwrap().is_empty());
    }

    #[test]
    fn test_write_and_read() {
        let mount = MemoryMount::new(1024);
        mount.write("docs/readme.txt", b"hello", false).unwrap();
        mount.write("docs/readme.txt", b" world", true).unwrap();

        assert!(mount.is_directory("docs").unwrap());
        assert_eq!(mount.read("docs/readme.txt").unwrap(), b"hello world");
        assert_eq!(mount.size("docs/readme.txt").unwrap(), 11);
        assert_eq!(mount.list("docs").unwrap(), vec!["readme.txt".to_string()]);
        assert_eq!(mount.remaining_space(), 1013);
    }

    #[test]
    fn test_capacity_enforced() {
        let mount = MemoryMount::new(4);
        mount.write("a", b"1234", false).unwrap();
        assert_eq!(mount.write("b", b"5", false), Err(VfsError::OutOfSpace));
        // Overwriting frees the old contents first.
        mount.write("a", b"12", false).unwrap();
        assert_eq!(mount.remaining_space(), 2);
    }

    #[test]
    fn test_delete_removes_subtree() {
        let mount = MemoryMount::new(1024)
            .with_file("a/b/c.txt", "x")
            .with_file("ab.txt", "y");
        mount.delete("a").unwrap();
        assert!(!mount.exists("a/b/c.txt").unwrap());
        assert!(!mount.exists("a").unwrap());
        assert!(mount.exists("ab.txt").unwrap());
        assert!(mount.delete("").is_err());
    }

    #[test]
    fn test_list_only_direct_children() {
        let mount = MemoryMount::new(1024)
            .with_file("rom/programs/ls", "")
            .with_file("rom/startup", "");
        let mut names = mount.list("rom").unwrap();
        names.sort();
        assert_eq!(names, vec!["programs".to_string(), "startup".to_string()]);
        assert!(matches!(mount.list("rom/startup"), Err(VfsError::WrongType(_))));
        assert!(matches!(mount.list("nope"), Err(VfsError::NotFound(_))));
    }
}
