mod memory;
mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

use crate::config::TutordeskConfig;
use crate::error::{Result, TutordeskError};

/// String key-value persistence. Values are whole serialized blobs; there is
/// no partial update.
pub trait KvStore {
    /// `Ok(None)` when the key has never been written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value under `key`.
    fn put(&self, key: &str, value: &str) -> Result<()>;
}

/// Enum wrapper for key-value backends. Dispatches to the concrete implementation.
#[derive(Clone)]
pub enum Storage {
    Sqlite(SqliteKvStore),
    Memory(MemoryKvStore),
}

impl KvStore for Storage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            Storage::Sqlite(s) => s.get(key),
            Storage::Memory(s) => s.get(key),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        match self {
            Storage::Sqlite(s) => s.put(key, value),
            Storage::Memory(s) => s.put(key, value),
        }
    }
}

/// Create the configured storage backend.
pub fn create_backend(config: &TutordeskConfig) -> Result<Storage> {
    match config.storage.backend.as_str() {
        "sqlite" => {
            let path = config.db_path();
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        TutordeskError::Storage(format!(
                            "failed to create {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
            }
            Ok(Storage::Sqlite(SqliteKvStore::open(&path)?))
        }
        "memory" => Ok(Storage::Memory(MemoryKvStore::new())),
        other => Err(TutordeskError::Config(format!(
            "unknown storage backend: {other}"
        ))),
    }
}
