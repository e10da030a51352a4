//! Persisted FauxPost records.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The persisted `{original, decoded, key}` triple for one identifier.
///
/// `original` is write-once, `decoded` tracks the latest save, and `key`
/// only changes when a new non-empty share key is supplied. Merging is done
/// by [`FauxPostRecord::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FauxPostRecord {
    /// First-seen source text
    #[serde(default)]
    pub original: Option<String>,

    /// Current rewritten text
    #[serde(default)]
    pub decoded: Option<String>,

    /// Outer share key currently associated with the record
    #[serde(default)]
    pub key: Option<String>,
}

impl FauxPostRecord {
    /// Apply an incoming update using the store's merge policy
    pub fn merge(&mut self, update: RecordUpdate) {
        if is_blank(&self.original) && !is_blank(&update.original) {
            self.original = update.original;
        }

        self.decoded = update.decoded;

        if !is_blank(&update.key) {
            self.key = update.key;
        }
    }

    /// True when nothing has been saved for this identifier
    pub fn is_empty(&self) -> bool {
        self.original.is_none() && self.decoded.is_none() && self.key.is_none()
    }

    /// Fingerprint of the stored original text, if any
    pub fn original_fingerprint(&self) -> Option<String> {
        self.original.as_deref().map(fingerprint)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

/// Incoming data for a save
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    pub original: Option<String>,
    pub decoded: Option<String>,
    pub key: Option<String>,
}

impl RecordUpdate {
    /// An update carrying only rewritten text
    pub fn decoded(decoded: impl Into<String>) -> Self {
        Self {
            original: None,
            decoded: Some(decoded.into()),
            key: None,
        }
    }

    /// Attach the source text
    pub fn with_original(mut self, original: impl Into<String>) -> Self {
        self.original = Some(original.into());
        self
    }

    /// Attach the outer share key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Hex SHA-256 of a piece of text.
///
/// Used to notice when the source content behind an identifier has changed
/// since its original was recorded.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sets_original_once() {
        let mut record = FauxPostRecord::default();
        record.merge(RecordUpdate::decoded("B").with_original("A"));
        record.merge(RecordUpdate::decoded("C").with_original("Z"));

        assert_eq!(record.original.as_deref(), Some("A"));
        assert_eq!(record.decoded.as_deref(), Some("C"));
    }

    #[test]
    fn test_merge_keeps_key_without_new_value() {
        let mut record = FauxPostRecord::default();
        record.merge(RecordUpdate::decoded("B").with_key("K1"));
        record.merge(RecordUpdate::decoded("C"));
        assert_eq!(record.key.as_deref(), Some("K1"));

        record.merge(RecordUpdate::decoded("D").with_key(""));
        assert_eq!(record.key.as_deref(), Some("K1"));

        record.merge(RecordUpdate::decoded("E").with_key("K2"));
        assert_eq!(record.key.as_deref(), Some("K2"));
    }

    #[test]
    fn test_merge_treats_empty_original_as_absent() {
        let mut record = FauxPostRecord {
            original: Some(String::new()),
            ..Default::default()
        };
        record.merge(RecordUpdate::decoded("B").with_original("A"));
        assert_eq!(record.original.as_deref(), Some("A"));
    }

    #[test]
    fn test_merge_always_replaces_decoded() {
        let mut record = FauxPostRecord::default();
        record.merge(RecordUpdate::decoded("B"));
        record.merge(RecordUpdate::default());
        assert_eq!(record.decoded, None);
    }

    #[test]
    fn test_record_deserializes_partial_json() {
        let record: FauxPostRecord = serde_json::from_str(r#"{"decoded":"x"}"#).unwrap();
        assert_eq!(record.original, None);
        assert_eq!(record.decoded.as_deref(), Some("x"));
        assert_eq!(record.key, None);

        let empty: FauxPostRecord = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_fingerprint() {
        assert_eq!(
            fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(fingerprint("abc").len(), 64);
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
    }
}
