//! Registry of memoized partition handles.
//!
//! Repeated requests for one namespace must return the same live handle:
//! a second connection to the same database would defeat the per-handle
//! serialization of in-flight operations. The registry owns the
//! get-or-create path behind a mutex so concurrent callers cannot race
//! duplicate handles into existence.

use crate::store::{Partition, StorageError};
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Opens partitions on first use and memoizes their handles by namespace.
/// Owned by the repository layer and passed by reference.
pub struct StoreRegistry {
    dir: PathBuf,
    handles: Mutex<HashMap<String, Partition>>,
}

impl StoreRegistry {
    /// Opens a registry rooted at `dir`, creating the directory when
    /// missing. Partition databases live directly underneath it.
    pub fn open(dir: impl AsRef<Path>) -> Result<StoreRegistry, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(StoreRegistry {
            dir,
            handles: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the partition registered under `namespace`, opening it on
    /// first use. Later calls return the same handle.
    pub fn partition(&self, namespace: &str) -> Result<Partition, StorageError> {
        let mut handles = self.handles.lock().expect("registry mutex poisoned");
        if let Some(handle) = handles.get(namespace) {
            return Ok(handle.clone());
        }
        let handle = Partition::open(namespace, self.partition_path(namespace))?;
        handles.insert(namespace.to_owned(), handle.clone());
        Ok(handle)
    }

    /// Destroys the partition registered under `namespace`: evicts the
    /// cached handle, closes its connection, and deletes its storage. A
    /// namespace that was never opened has only its storage deleted.
    pub fn destroy(&self, namespace: &str) -> Result<(), StorageError> {
        let handle = {
            let mut handles = self.handles.lock().expect("registry mutex poisoned");
            handles.remove(namespace)
        };
        match handle {
            Some(handle) => handle.destroy()?,
            None => match fs::remove_file(self.partition_path(namespace)) {
                Ok(()) => debug!("destroyed partition '{namespace}'"),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => Err(error)?,
            },
        }
        Ok(())
    }

    /// Maps a namespace to its database file. Namespaces may contain `/`
    /// separators; files may not.
    fn partition_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.sqlite", namespace.replace('/', "-")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Record;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
    }

    impl Record for Item {
        fn key(&self) -> String {
            self.id.to_owned()
        }
    }

    #[test]
    fn memoizes_handles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = StoreRegistry::open(dir.path()).expect("open");

        let first = registry.partition("tables").expect("partition");
        let second = registry.partition("tables").expect("partition");
        first.set_item(&Item { id: "a".to_owned() }).expect("set");
        // Same live handle: the write is visible through the other clone
        assert_eq!(second.keys().unwrap(), vec!["a"]);
    }

    #[test]
    fn destroy_evicts_and_deletes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = StoreRegistry::open(dir.path()).expect("open");

        let handle = registry.partition("rows/abc").expect("partition");
        handle.set_item(&Item { id: "a".to_owned() }).expect("set");
        registry.destroy("rows/abc").expect("destroy");

        // The stale handle is unusable
        assert!(handle.keys().is_err());
        // A fresh request opens a brand new, empty partition
        let reopened = registry.partition("rows/abc").expect("partition");
        assert!(reopened.keys().unwrap().is_empty());
    }

    #[test]
    fn destroying_unopened_namespace_is_harmless() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = StoreRegistry::open(dir.path()).expect("open");
        registry.destroy("rows/never-opened").expect("destroy");
    }

    #[test]
    fn namespace_separators_map_to_file_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = StoreRegistry::open(dir.path()).expect("open");
        registry.partition("rows/abc").expect("partition");
        assert!(dir.path().join("rows-abc.sqlite").exists());
    }
}
