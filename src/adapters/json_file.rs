//! JSON-file key-value store.
//!
//! All entries live in one pretty-printed JSON object. Every write is a
//! full read-modify-write cycle run under an in-process mutex plus an
//! advisory lock on a sidecar `.lock` file, so writers in other processes
//! cannot interleave with it. The file is rewritten through a temp file and
//! rename, so readers never see a partial write.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::{select, KeyValueStore, StoreError, UpdateFn};

/// File-backed store
#[derive(Debug)]
pub struct JsonFileStore {
    /// Path to the JSON file
    path: PathBuf,

    /// Serializes read-modify-write cycles within this process
    guard: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store at `path`, creating its parent directory
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        Ok(Self {
            path,
            guard: Mutex::new(()),
        })
    }

    /// Path to the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn read_entries(&self) -> Result<HashMap<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    async fn write_entries(&self, entries: &HashMap<String, Value>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(entries)?;
        let temp = self.temp_path();

        fs::write(&temp, content)
            .await
            .map_err(|source| StoreError::Io {
                path: temp.clone(),
                source,
            })?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        Ok(())
    }

    /// Take the cross-process lock. Blocks on a worker thread, not the
    /// runtime.
    async fn lock_file(&self) -> Result<File, StoreError> {
        let lock_path = self.lock_path();
        let path = lock_path.clone();

        tokio::task::spawn_blocking(move || {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(false)
                .open(&path)?;
            file.lock_exclusive()?;
            Ok::<_, std::io::Error>(file)
        })
        .await
        .map_err(std::io::Error::other)
        .and_then(|locked| locked)
        .map_err(|source| StoreError::Io {
            path: lock_path,
            source,
        })
    }

    /// Run a read-modify-write cycle under both locks. Nothing is written
    /// if `apply` fails.
    async fn rewrite<T, F>(&self, apply: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut HashMap<String, Value>) -> Result<T, StoreError>,
    {
        let _guard = self.guard.lock().await;
        let lock = self.lock_file().await?;

        let mut entries = self.read_entries().await?;
        let output = apply(&mut entries)?;
        self.write_entries(&entries).await?;

        // Lock is released when the file is dropped
        drop(lock);
        debug!(path = %self.path.display(), entries = entries.len(), "Rewrote store");
        Ok(output)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn get(&self, keys: Option<&[String]>) -> Result<HashMap<String, Value>, StoreError> {
        let _guard = self.guard.lock().await;
        let entries = self.read_entries().await?;
        Ok(select(&entries, keys))
    }

    async fn set(&self, items: HashMap<String, Value>) -> Result<(), StoreError> {
        self.rewrite(|entries| {
            entries.extend(items);
            Ok(())
        })
        .await
    }

    async fn remove(&self, keys: &[String]) -> Result<(), StoreError> {
        self.rewrite(|entries| {
            for key in keys {
                entries.remove(key);
            }
            Ok(())
        })
        .await
    }

    async fn update(&self, key: &str, apply: UpdateFn<'_>) -> Result<Value, StoreError> {
        self.rewrite(|entries| {
            let value = apply(entries.get(key).cloned())?;
            entries.insert(key.to_string(), value.clone());
            Ok(value)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp.path().join("store.json")).await.unwrap();
        assert!(store.get(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("store.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .set(HashMap::from([("fauxPostEnabled".to_string(), json!(false))]))
            .await
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let all = reopened.get(None).await.unwrap();
        assert_eq!(all["fauxPostEnabled"], json!(false));
        assert!(!reopened.temp_path().exists());
    }

    #[tokio::test]
    async fn test_remove_ignores_absent_keys() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp.path().join("store.json")).await.unwrap();
        store
            .set(HashMap::from([
                ("a".to_string(), json!(1)),
                ("b".to_string(), json!(2)),
            ]))
            .await
            .unwrap();

        store
            .remove(&["a".to_string(), "zzz".to_string()])
            .await
            .unwrap();

        let all = store.get(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["b"], json!(2));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        let result = store.get(None).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_update_failure_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .set(HashMap::from([("k".to_string(), json!("kept"))]))
            .await
            .unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let result = store
            .update("k", Box::new(|_: Option<Value>| {
                Err(StoreError::Corrupt {
                    key: "k".to_string(),
                    reason: "rejected".to_string(),
                })
            }))
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_updates_from_separate_handles_do_not_interleave() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");

        // Separate handles share only the file lock, like separate processes
        let mut handles = Vec::new();
        for _ in 0..8 {
            let path = path.clone();
            handles.push(tokio::spawn(async move {
                let store = JsonFileStore::open(&path).await.unwrap();
                for _ in 0..5 {
                    store
                        .update("counter", Box::new(|current: Option<Value>| {
                            let n = current.and_then(|v| v.as_i64()).unwrap_or(0);
                            Ok(json!(n + 1))
                        }))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.get(None).await.unwrap()["counter"], json!(40));
    }
}
