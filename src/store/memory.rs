use super::{RecordStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-process store keeping the latest value per path.
///
/// Clones share the same contents, so a test can keep one handle while the
/// publisher owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryContents>>,
}

#[derive(Debug, Default)]
struct MemoryContents {
    values: HashMap<String, Value>,
    writes: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Value> {
        self.lock().values.get(path).cloned()
    }

    /// Number of locations currently holding a value.
    pub fn len(&self) -> usize {
        self.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_count(&self) -> u64 {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryContents> {
        // Poisoned only if a holder panicked mid-insert
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn set(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        let mut contents = self.lock();
        contents.values.insert(path.to_string(), value.clone());
        contents.writes += 1;
        Ok(())
    }
}
