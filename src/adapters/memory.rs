//! In-memory key-value store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{select, KeyValueStore, StoreError, UpdateFn};

/// Volatile store, used by tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing entries
    pub fn with_entries(entries: HashMap<String, Value>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, keys: Option<&[String]>) -> Result<HashMap<String, Value>, StoreError> {
        let entries = self.entries.lock().await;
        Ok(select(&entries, keys))
    }

    async fn set(&self, items: HashMap<String, Value>) -> Result<(), StoreError> {
        self.entries.lock().await.extend(items);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn update(&self, key: &str, apply: UpdateFn<'_>) -> Result<Value, StoreError> {
        let mut entries = self.entries.lock().await;
        let value = apply(entries.get(key).cloned())?;
        entries.insert(key.to_string(), value.clone());
        Ok(value)
    }
}
