//! Persistence port and its adapters.
//!
//! A store holds named JSON blobs. It performs no validation, migration or
//! versioning; the state manager decides what goes under each key.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const USERS_KEY: &str = "users";
pub const POSTS_KEY: &str = "posts";
pub const ACTIVITY_LOGS_KEY: &str = "activityLogs";
pub const CURRENT_USER_KEY: &str = "currentUser";

/// Key-value persistence for JSON blobs
pub trait Store {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Removing an absent key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Store chosen at runtime
pub type DynStore = Box<dyn Store + Send>;

impl<T: Store + ?Sized> Store for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Read and decode a blob
pub fn load_json<T: DeserializeOwned, S: Store + ?Sized>(
    store: &S,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and write a blob
pub fn save_json<T: Serialize + ?Sized, S: Store + ?Sized>(
    store: &mut S,
    key: &str,
    value: &T,
) -> Result<()> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json)
}

/// One pending change in a multi-key commit
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Set(&'static str, String),
    Remove(&'static str),
}

impl Write {
    /// Encode `value` as the new blob for `key`
    pub fn json<T: Serialize + ?Sized>(key: &'static str, value: &T) -> Result<Self> {
        Ok(Write::Set(key, serde_json::to_string(value)?))
    }

    pub fn key(&self) -> &'static str {
        match self {
            Write::Set(key, _) | Write::Remove(key) => key,
        }
    }
}

/// Apply `writes` in order.
///
/// If any write fails, the keys already written are put back to their
/// previous contents before the error is returned.
pub fn write_all<S: Store + ?Sized>(store: &mut S, writes: &[Write]) -> Result<()> {
    let mut undo: Vec<(&'static str, Option<String>)> = Vec::with_capacity(writes.len());

    for write in writes {
        match apply_one(store, write) {
            Ok(previous) => undo.push((write.key(), previous)),
            Err(e) => {
                while let Some((key, previous)) = undo.pop() {
                    let restored = match previous {
                        Some(raw) => store.set(key, &raw),
                        None => store.remove(key),
                    };
                    if let Err(restore_err) = restored {
                        tracing::warn!(key, "rollback failed: {restore_err}");
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(())
}

fn apply_one<S: Store + ?Sized>(store: &mut S, write: &Write) -> Result<Option<String>> {
    let previous = store.get(write.key())?;
    match write {
        Write::Set(key, raw) => store.set(key, raw)?,
        Write::Remove(key) => store.remove(key)?,
    }
    Ok(previous)
}

/// In-process store, lost on exit.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key under a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "opened json file store");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Store for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortalError;
    use crate::test_utils::FailingStore;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_set_get_remove() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get(USERS_KEY).unwrap(), None);

        store.set(USERS_KEY, "[]").unwrap();
        assert_eq!(store.get(USERS_KEY).unwrap().as_deref(), Some("[]"));

        store.remove(USERS_KEY).unwrap();
        assert!(store.is_empty());

        // Removing twice is fine
        store.remove(USERS_KEY).unwrap();
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        {
            let mut store = JsonFileStore::open(dir.path()).unwrap();
            save_json(&mut store, POSTS_KEY, &vec![1, 2, 3]).unwrap();
        }

        let store = JsonFileStore::open(dir.path()).unwrap();
        let posts: Option<Vec<u32>> = load_json(&store, POSTS_KEY).unwrap();
        assert_eq!(posts, Some(vec![1, 2, 3]));
        assert!(dir.path().join("posts.json").exists());
    }

    #[test]
    fn test_file_store_missing_key_and_remove() {
        let dir = tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("nested")).unwrap();
        assert_eq!(store.get(CURRENT_USER_KEY).unwrap(), None);
        store.remove(CURRENT_USER_KEY).unwrap();

        store.set(CURRENT_USER_KEY, "{}").unwrap();
        store.remove(CURRENT_USER_KEY).unwrap();
        assert_eq!(store.get(CURRENT_USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_load_json_reports_corrupt_blob() {
        let mut store = MemoryStore::new();
        store.set(ACTIVITY_LOGS_KEY, "not json").unwrap();
        let result: Result<Option<Vec<String>>> = load_json(&store, ACTIVITY_LOGS_KEY);
        assert!(result.is_err());
    }

    #[test]
    fn test_write_all_applies_in_order() {
        let mut store = MemoryStore::new();
        store.set(CURRENT_USER_KEY, "{}").unwrap();
        write_all(
            &mut store,
            &[
                Write::json(POSTS_KEY, &vec![1]).unwrap(),
                Write::Remove(CURRENT_USER_KEY),
            ],
        )
        .unwrap();
        assert_eq!(store.get(POSTS_KEY).unwrap().as_deref(), Some("[1]"));
        assert_eq!(store.get(CURRENT_USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_write_all_restores_earlier_keys_on_failure() {
        let mut store = FailingStore::new();
        store.inner.set(USERS_KEY, "[\"old\"]").unwrap();
        store.inner.set(CURRENT_USER_KEY, "{}").unwrap();
        store.fail_keys.push(ACTIVITY_LOGS_KEY);

        let result = write_all(
            &mut store,
            &[
                Write::Set(USERS_KEY, "[\"new\"]".to_string()),
                Write::Set(POSTS_KEY, "[]".to_string()),
                Write::Remove(CURRENT_USER_KEY),
                Write::Set(ACTIVITY_LOGS_KEY, "[]".to_string()),
            ],
        );
        assert!(matches!(result, Err(PortalError::Storage(_))));

        assert_eq!(store.get(USERS_KEY).unwrap().as_deref(), Some("[\"old\"]"));
        assert_eq!(store.get(POSTS_KEY).unwrap(), None);
        assert_eq!(store.get(CURRENT_USER_KEY).unwrap().as_deref(), Some("{}"));
        assert_eq!(store.get(ACTIVITY_LOGS_KEY).unwrap(), None);
    }

    #[test]
    fn test_boxed_store_delegates() {
        let mut store: DynStore = Box::new(MemoryStore::new());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
