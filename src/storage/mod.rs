//! Key-value persistence for bots and finance records.
//!
//! Every collection is stored as one JSON document under a fixed key.
//! Persistence is best effort: unreadable data falls back to a default and
//! failed writes are logged, never surfaced.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// Minimal string key-value store.
pub trait KvStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] when the entry exists but cannot be removed.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<T: KvStore + ?Sized> KvStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// In-process store, used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<FxHashMap<String, String>>,
}

impl MemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct DirKvStore {
    root: PathBuf,
}

impl DirKvStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !valid {
            return Err(StoreError::Invalid(format!("invalid storage key '{key}'")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KvStore for DirKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Load a JSON value, falling back to `default` when the key is missing or
/// its contents cannot be read.
pub fn load_json<S, T>(store: &S, key: &str, default: T) -> T
where
    S: KvStore + ?Sized,
    T: DeserializeOwned,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return default,
        Err(err) => {
            tracing::warn!(key, error = %err, "failed to read stored data, using default");
            return default;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key, error = %err, "stored data is not valid JSON, using default");
            default
        }
    }
}

/// Save a JSON value. Failures are logged and otherwise ignored.
pub fn save_json<S, T>(store: &S, key: &str, value: &T)
where
    S: KvStore + ?Sized,
    T: Serialize + ?Sized,
{
    let result = serde_json::to_string(value)
        .map_err(StoreError::from)
        .and_then(|raw| store.set(key, &raw));
    if let Err(err) = result {
        tracing::warn!(key, error = %err, "failed to persist data");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryKvStore::new();
        assert!(store.get("k").unwrap().is_none());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_dir_store_writes_one_file_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirKvStore::new(dir.path().join("nested"));
        store.set("bots", "[]").unwrap();
        assert!(dir.path().join("nested/bots.json").exists());
        assert_eq!(store.get("bots").unwrap().as_deref(), Some("[]"));
        store.remove("bots").unwrap();
        store.remove("bots").unwrap();
        assert!(store.get("bots").unwrap().is_none());
    }

    #[test]
    fn test_dir_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirKvStore::new(dir.path());
        assert!(matches!(
            store.set("../escape", "x"),
            Err(StoreError::Invalid(_))
        ));
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_load_json_falls_back_on_garbage() {
        let store = MemoryKvStore::new();
        store.set("numbers", "not json").unwrap();
        let numbers: Vec<u32> = load_json(&store, "numbers", vec![7]);
        assert_eq!(numbers, vec![7]);
        let missing: Vec<u32> = load_json(&store, "missing", Vec::new());
        assert!(missing.is_empty());
    }

    #[test]
    fn test_save_then_load_json() {
        let store = MemoryKvStore::new();
        save_json(&store, "numbers", &vec![1, 2, 3]);
        let numbers: Vec<u32> = load_json(&store, "numbers", Vec::new());
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
