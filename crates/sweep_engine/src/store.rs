//! Key-value persistence for the two collector snapshots. Every save
//! replaces the whole value of its key.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use sweep_core::{SnapshotKey, SubdomainRecord};

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("io error reading {key}: {source}")]
    Read {
        key: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("snapshot {key} is not valid JSON: {source}")]
    Corrupt {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode snapshot {key}: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub trait KeyValueStore: Send + Sync {
    fn load(&self, key: SnapshotKey) -> Result<Option<String>, StoreError>;
    fn save(&self, key: SnapshotKey, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: SnapshotKey) -> Result<(), StoreError>;
}

/// One `<key>.json` file per key inside a state directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    writer: AtomicFileWriter,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }

    pub fn path_for(&self, key: SnapshotKey) -> PathBuf {
        self.writer.dir().join(file_name(key))
    }
}

fn file_name(key: SnapshotKey) -> String {
    format!("{}.json", key.as_str())
}

impl KeyValueStore for FileStore {
    fn load(&self, key: SnapshotKey) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                key: key.as_str(),
                source,
            }),
        }
    }

    fn save(&self, key: SnapshotKey, value: &str) -> Result<(), StoreError> {
        self.writer.write(&file_name(key), value)?;
        Ok(())
    }

    fn remove(&self, key: SnapshotKey) -> Result<(), StoreError> {
        self.writer.remove(&file_name(key))?;
        Ok(())
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<SnapshotKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: SnapshotKey) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(&key).cloned())
    }

    fn save(&self, key: SnapshotKey, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: SnapshotKey) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(&key);
        Ok(())
    }
}

pub fn save_records(
    store: &dyn KeyValueStore,
    key: SnapshotKey,
    records: &[SubdomainRecord],
) -> Result<(), StoreError> {
    let json = serde_json::to_string(records).map_err(|source| StoreError::Encode {
        key: key.as_str(),
        source,
    })?;
    store.save(key, &json)
}

/// A key that was never saved loads as an empty list.
pub fn load_records(
    store: &dyn KeyValueStore,
    key: SnapshotKey,
) -> Result<Vec<SubdomainRecord>, StoreError> {
    match store.load(key)? {
        Some(json) => serde_json::from_str(&json).map_err(|source| StoreError::Corrupt {
            key: key.as_str(),
            source,
        }),
        None => Ok(Vec::new()),
    }
}
