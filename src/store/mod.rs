//! # Partitioned Local Persistence
//!
//! A generic key-value persistence primitive organized into independently
//! creatable and destroyable named partitions. Each partition is one SQLite
//! database file holding JSON records keyed by id; destroying a partition
//! closes its connection and deletes the file, which makes "drop this whole
//! collection" a single filesystem operation instead of an enumerated
//! per-record delete.

mod registry;

pub use registry::StoreRegistry;

use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by partition operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{0}")]
    SqliteError(#[from] rusqlite::Error),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    IoError(#[from] std::io::Error),

    /// The partition's connection was closed or its storage destroyed;
    /// the handle (and every clone of it) is permanently unusable.
    #[error("Partition '{0}' is closed")]
    PartitionClosedError(String),
}

/// A record that can be stored in a partition.
pub trait Record: Serialize + DeserializeOwned {
    /// Stable id used as the record's primary key.
    fn key(&self) -> String;
}

/// Handle to one named partition. Clones share the same underlying
/// connection, so operations issued through any clone are serialized
/// against a single database handle.
#[derive(Clone)]
pub struct Partition {
    inner: Arc<PartitionInner>,
}

struct PartitionInner {
    namespace: String,
    path: PathBuf,
    connection: Mutex<Option<Connection>>,
}

impl Partition {
    /// Opens the partition's database, creating it on first use.
    pub(crate) fn open(namespace: &str, path: PathBuf) -> Result<Partition, StorageError> {
        let connection = Connection::open(&path)?;
        connection.busy_timeout(Duration::from_secs(5))?;
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                body TEXT NOT NULL
            )",
        )?;
        debug!("opened partition '{namespace}' at {}", path.display());
        Ok(Partition {
            inner: Arc::new(PartitionInner {
                namespace: namespace.to_owned(),
                path,
                connection: Mutex::new(Some(connection)),
            }),
        })
    }

    /// The namespace this partition was opened under.
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    fn with_connection<T>(
        &self,
        operation: impl FnOnce(&Connection) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let guard = self.inner.connection.lock().expect("partition mutex poisoned");
        match guard.as_ref() {
            Some(connection) => operation(connection),
            None => Err(StorageError::PartitionClosedError(
                self.inner.namespace.to_owned(),
            )),
        }
    }

    /// Returns every record in the partition.
    pub fn get_all<T: Record>(&self) -> Result<Vec<T>, StorageError> {
        self.with_connection(|connection| {
            let mut statement = connection.prepare("SELECT body FROM records ORDER BY id")?;
            let mut rows = statement.query([])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                let body: String = row.get(0)?;
                records.push(serde_json::from_str(&body)?);
            }
            Ok(records)
        })
    }

    /// Returns every record key in the partition.
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.with_connection(|connection| {
            let mut statement = connection.prepare("SELECT id FROM records ORDER BY id")?;
            let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
            let mut keys = Vec::new();
            for key in rows {
                keys.push(key?);
            }
            Ok(keys)
        })
    }

    /// Point lookup by record key.
    pub fn get_item<T: Record>(&self, id: &str) -> Result<Option<T>, StorageError> {
        self.with_connection(|connection| {
            let body = connection
                .query_row(
                    "SELECT body FROM records WHERE id = ?1",
                    params![id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            body.map(|body| Ok(serde_json::from_str(&body)?)).transpose()
        })
    }

    /// Inserts or replaces a record under its own key.
    pub fn set_item<T: Record>(&self, item: &T) -> Result<(), StorageError> {
        self.with_connection(|connection| {
            let body = serde_json::to_string(item)?;
            connection.execute(
                "INSERT OR REPLACE INTO records (id, body) VALUES (?1, ?2)",
                params![item.key(), body],
            )?;
            Ok(())
        })
    }

    /// Removes a record by key. Removing an absent key is a no-op.
    pub fn remove_item(&self, id: &str) -> Result<(), StorageError> {
        self.with_connection(|connection| {
            connection.execute("DELETE FROM records WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    /// Removes every record while keeping the partition itself.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.with_connection(|connection| {
            connection.execute("DELETE FROM records", [])?;
            Ok(())
        })
    }

    /// Closes the connection. Every subsequent operation on this handle or
    /// any clone of it fails with [`StorageError::PartitionClosedError`].
    pub fn close(&self) -> Result<(), StorageError> {
        let mut guard = self.inner.connection.lock().expect("partition mutex poisoned");
        guard.take();
        Ok(())
    }

    /// Irreversibly deletes the partition's storage. The connection is
    /// closed before the file is removed so the database is never deleted
    /// out from under a live handle.
    ///
    /// Obtain partitions through a [`StoreRegistry`] and destroy them with
    /// [`StoreRegistry::destroy`] so the cached handle is evicted as well.
    pub fn destroy(&self) -> Result<(), StorageError> {
        self.close()?;
        match fs::remove_file(self.path()) {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => Err(error)?,
        }
        debug!("destroyed partition '{}'", self.inner.namespace);
        Ok(())
    }

    pub(crate) fn path(&self) -> &PathBuf {
        &self.inner.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
        label: String,
    }

    impl Record for Item {
        fn key(&self) -> String {
            self.id.to_owned()
        }
    }

    fn item(id: &str, label: &str) -> Item {
        Item {
            id: id.to_owned(),
            label: label.to_owned(),
        }
    }

    fn partition(dir: &tempfile::TempDir) -> Partition {
        Partition::open("items", dir.path().join("items.sqlite")).expect("open")
    }

    #[test]
    fn set_get_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let partition = partition(&dir);

        partition.set_item(&item("a", "first")).expect("set");
        partition.set_item(&item("b", "second")).expect("set");
        assert_eq!(partition.get_item::<Item>("a").unwrap(), Some(item("a", "first")));
        assert_eq!(partition.keys().unwrap(), vec!["a", "b"]);

        partition.remove_item("a").expect("remove");
        assert_eq!(partition.get_item::<Item>("a").unwrap(), None);
        // Removing again is a no-op
        partition.remove_item("a").expect("remove");
    }

    #[test]
    fn set_item_replaces() {
        let dir = tempfile::tempdir().expect("tempdir");
        let partition = partition(&dir);

        partition.set_item(&item("a", "first")).expect("set");
        partition.set_item(&item("a", "updated")).expect("set");
        assert_eq!(
            partition.get_item::<Item>("a").unwrap(),
            Some(item("a", "updated"))
        );
        assert_eq!(partition.get_all::<Item>().unwrap().len(), 1);
    }

    #[test]
    fn clear_keeps_partition() {
        let dir = tempfile::tempdir().expect("tempdir");
        let partition = partition(&dir);

        partition.set_item(&item("a", "first")).expect("set");
        partition.clear().expect("clear");
        assert!(partition.get_all::<Item>().unwrap().is_empty());
        partition.set_item(&item("b", "second")).expect("set again");
    }

    #[test]
    fn destroyed_handle_rejects_operations() {
        let dir = tempfile::tempdir().expect("tempdir");
        let partition = partition(&dir);
        let clone = partition.clone();

        partition.set_item(&item("a", "first")).expect("set");
        partition.destroy().expect("destroy");
        assert!(!partition.path().exists());
        assert!(matches!(
            clone.get_item::<Item>("a"),
            Err(StorageError::PartitionClosedError(_))
        ));
        assert!(matches!(
            clone.set_item(&item("b", "late")),
            Err(StorageError::PartitionClosedError(_))
        ));
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("items.sqlite");

        let partition = Partition::open("items", path.clone()).expect("open");
        partition.set_item(&item("a", "first")).expect("set");
        partition.close().expect("close");

        let reopened = Partition::open("items", path).expect("reopen");
        assert_eq!(
            reopened.get_item::<Item>("a").unwrap(),
            Some(item("a", "first"))
        );
    }
}
