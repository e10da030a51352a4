//! Persistence adapters.
//!
//! The record store talks to storage only through [`KeyValueStore`], a
//! narrow `get`/`set`/`remove`/`update` capability over JSON values.
//! Implementations must apply their own operations in call order, and an
//! `update` must not interleave with any other write to the same store.

pub mod json_file;
pub mod memory;

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Errors raised at the persistence boundary
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt entry {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Read-modify-write step for [`KeyValueStore::update`].
///
/// Receives the current value (if any) and returns the value to store.
/// Returning an error leaves the entry untouched.
pub type UpdateFn<'a> =
    Box<dyn FnOnce(Option<Value>) -> Result<Value, StoreError> + Send + 'a>;

/// Key-value persistence capability
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Fetch the named keys, or every entry when `keys` is `None`.
    ///
    /// Missing keys are simply absent from the result.
    async fn get(&self, keys: Option<&[String]>) -> Result<HashMap<String, Value>, StoreError>;

    /// Insert or overwrite entries
    async fn set(&self, items: HashMap<String, Value>) -> Result<(), StoreError>;

    /// Delete entries; absent keys are ignored
    async fn remove(&self, keys: &[String]) -> Result<(), StoreError>;

    /// Atomically replace one entry with `apply(current)`, returning the
    /// stored value
    async fn update(&self, key: &str, apply: UpdateFn<'_>) -> Result<Value, StoreError>;
}

/// Pick the requested keys out of a full snapshot
pub(crate) fn select(
    entries: &HashMap<String, Value>,
    keys: Option<&[String]>,
) -> HashMap<String, Value> {
    match keys {
        None => entries.clone(),
        Some(keys) => keys
            .iter()
            .filter_map(|k| entries.get(k).map(|v| (k.clone(), v.clone())))
            .collect(),
    }
}
