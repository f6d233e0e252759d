use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use super::KvStore;
use crate::error::{Result, TutordeskError};

/// SQLite-backed key-value store.
///
/// A single `Connection` behind `Arc<Mutex<>>`; clones share it.
#[derive(Clone)]
pub struct SqliteKvStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKvStore {
    /// Open (or create) a file-backed database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            TutordeskError::Storage(format!("failed to open SQLite database: {e}"))
        })?;

        Self::configure_and_init(conn)
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            TutordeskError::Storage(format!("failed to open in-memory SQLite database: {e}"))
        })?;

        Self::configure_and_init(conn)
    }

    fn configure_and_init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(|e| TutordeskError::Storage(format!("failed to set WAL mode: {e}")))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.create_tables()?;
        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| TutordeskError::Storage(format!("failed to create tables: {e}")))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TutordeskError::Storage(format!("failed to acquire database lock: {e}")))
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| TutordeskError::Storage(format!("failed to read key '{key}': {e}")))
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )
        .map_err(|e| TutordeskError::Storage(format!("failed to write key '{key}': {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_creates_kv_table() {
        let store = SqliteKvStore::open_in_memory().expect("should open in-memory DB");
        let conn = store.conn.lock().unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert!(tables.contains(&"kv".to_string()));
    }

    #[test]
    fn create_tables_is_idempotent() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        store.create_tables().expect("idempotent create_tables");
    }

    #[test]
    fn get_missing_key_is_none() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        assert_eq!(store.get("tutorAvailability").unwrap(), None);
    }

    #[test]
    fn put_overwrites_value() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        store.put("k", "[]").unwrap();
        store.put("k", "[1]").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("[1]"));

        let clone = store.clone();
        assert_eq!(clone.get("k").unwrap().as_deref(), Some("[1]"));
    }
}
