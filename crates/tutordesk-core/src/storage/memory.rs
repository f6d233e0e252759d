use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::KvStore;
use crate::error::{Result, TutordeskError};

/// Process-local key-value store. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail with a storage error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| TutordeskError::Storage(format!("failed to acquire store lock: {e}")))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TutordeskError::Storage(format!(
                "write to '{key}' rejected: store is read-only"
            )));
        }
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| TutordeskError::Storage(format!("failed to acquire store lock: {e}")))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
