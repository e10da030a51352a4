//! Per-identifier record store over a [`KeyValueStore`].
//!
//! Each record lives under `fauxPost_<identifier>`. Other keys in the
//! backend (such as the enable toggle) are ignored here.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::adapters::{KeyValueStore, StoreError};
use crate::domain::{FauxPostRecord, RecordUpdate};

/// Prefix of every record key in the backend
pub const RECORD_PREFIX: &str = "fauxPost_";

/// Keyed persistence of FauxPost records
pub struct RecordStore {
    backend: Arc<dyn KeyValueStore>,
}

impl RecordStore {
    /// Create a record store on top of a persistence backend
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Backend key for an identifier
    pub fn storage_key(identifier: &str) -> String {
        format!("{}{}", RECORD_PREFIX, identifier)
    }

    /// Every persisted record, keyed by identifier
    pub async fn get_all(&self) -> Result<BTreeMap<String, FauxPostRecord>, StoreError> {
        let entries = self.backend.get(None).await?;
        let mut records = BTreeMap::new();

        for (key, value) in entries {
            let Some(identifier) = key.strip_prefix(RECORD_PREFIX) else {
                continue;
            };
            match decode_record(&key, value) {
                Ok(record) => {
                    records.insert(identifier.to_string(), record);
                }
                Err(e) => warn!(error = %e, "Skipping unreadable record"),
            }
        }

        debug!(count = records.len(), "Loaded all records");
        Ok(records)
    }

    /// The record for `identifier`, or an empty record if none exists
    pub async fn get_one(&self, identifier: &str) -> Result<FauxPostRecord, StoreError> {
        let key = Self::storage_key(identifier);
        let mut entries = self.backend.get(Some(std::slice::from_ref(&key))).await?;

        match entries.remove(&key) {
            Some(value) => decode_record(&key, value),
            None => Ok(FauxPostRecord::default()),
        }
    }

    /// Merge an update into the stored record and persist it.
    ///
    /// `original` is only filled when still empty, `decoded` is always
    /// replaced, and `key` only changes when the update carries a non-empty
    /// one. The merge runs inside the backend's atomic update, so concurrent
    /// saves (from any process sharing the backend) apply one after the
    /// other. Returns the record as written.
    pub async fn save(
        &self,
        identifier: &str,
        update: RecordUpdate,
    ) -> Result<FauxPostRecord, StoreError> {
        let key = Self::storage_key(identifier);
        let storage_key = key.as_str();

        let stored = self
            .backend
            .update(
                storage_key,
                Box::new(move |current: Option<Value>| {
                    let mut record = match current {
                        Some(value) => decode_record(storage_key, value)?,
                        None => FauxPostRecord::default(),
                    };
                    record.merge(update);
                    Ok(serde_json::to_value(&record)?)
                }),
            )
            .await?;
        let record = decode_record(&key, stored)?;

        debug!(
            identifier,
            has_original = record.original.is_some(),
            has_key = record.key.is_some(),
            "Saved record"
        );
        Ok(record)
    }

    /// Delete the named records; unknown identifiers are ignored
    pub async fn remove<I, S>(&self, identifiers: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: Vec<String> = identifiers
            .into_iter()
            .map(|id| Self::storage_key(id.as_ref()))
            .collect();

        if keys.is_empty() {
            return Ok(());
        }

        self.backend.remove(&keys).await?;
        debug!(count = keys.len(), "Removed records");
        Ok(())
    }

    /// Delete every record, returning how many were removed
    pub async fn remove_all(&self) -> Result<usize, StoreError> {
        let keys: Vec<String> = self
            .backend
            .get(None)
            .await?
            .into_keys()
            .filter(|k| k.starts_with(RECORD_PREFIX))
            .collect();

        if !keys.is_empty() {
            self.backend.remove(&keys).await?;
        }
        debug!(count = keys.len(), "Removed all records");
        Ok(keys.len())
    }

    /// Number of stored records
    pub async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.get_all().await?.len())
    }
}

fn decode_record(key: &str, value: Value) -> Result<FauxPostRecord, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
