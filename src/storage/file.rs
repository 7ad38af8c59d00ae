//! File-backed key/value store
//!
//! All items live in one JSON object file. Every operation reads the file
//! afresh, so concurrent writers only overwrite the keys they touch. Writes
//! go through a temporary sibling and a rename.

use super::KeyValueStore;
use crate::error::{QuarryError, QuarryResult};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

type Items = BTreeMap<String, String>;

/// Key/value store persisted to a single JSON file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file is missing
    pub fn open(path: impl Into<PathBuf>) -> QuarryResult<Self> {
        let store = Self {
            path: path.into(),
            lock: Mutex::new(()),
        };

        let items = store.load()?;
        debug!("Opened store {} ({} items)", store.path.display(), items.len());

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current file contents; an unreadable document counts as empty
    fn load(&self) -> QuarryResult<Items> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Items::new()),
            Err(e) => {
                return Err(QuarryError::io(
                    format!("reading store {}", self.path.display()),
                    e,
                ))
            }
        };

        if content.trim().is_empty() {
            return Ok(Items::new());
        }

        match serde_json::from_str(&content) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!(
                    "Ignoring unreadable store {}; it will be replaced on next write: {}",
                    self.path.display(),
                    e
                );
                Ok(Items::new())
            }
        }
    }

    /// Re-read the file, apply `change` and write it back if anything changed
    fn update(&self, change: impl FnOnce(&mut Items) -> bool) -> QuarryResult<()> {
        let _guard = self.lock();
        let mut items = self.load()?;
        if change(&mut items) {
            self.persist(&items)?;
        }
        Ok(())
    }

    fn persist(&self, items: &Items) -> QuarryResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| QuarryError::io(format!("creating {}", parent.display()), e))?;
        }

        let content = serde_json::to_string(items)?;
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", std::process::id()));

        fs::write(&tmp, content)
            .map_err(|e| QuarryError::io(format!("writing store {}", tmp.display()), e))?;

        // Cached payloads may hold API responses
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&tmp, perms)
                .map_err(|e| QuarryError::io("setting store file permissions", e))?;
        }

        fs::rename(&tmp, &self.path)
            .map_err(|e| QuarryError::io(format!("replacing store {}", self.path.display()), e))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> QuarryResult<Option<String>> {
        let _guard = self.lock();
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> QuarryResult<()> {
        self.update(|items| {
            items.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove_item(&self, key: &str) -> QuarryResult<()> {
        self.update(|items| items.remove(key).is_some())
    }

    fn keys(&self) -> QuarryResult<Vec<String>> {
        let _guard = self.lock();
        Ok(self.load()?.into_keys().collect())
    }

    fn clear(&self) -> QuarryResult<()> {
        let _guard = self.lock();
        self.persist(&Items::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_opens_empty() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path().join("store.json")).unwrap();
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn items_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set_item("http://x/data", "[1,42]").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get_item("http://x/data").unwrap().as_deref(),
            Some("[1,42]")
        );
    }

    #[test]
    fn remove_and_clear_persist() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set_item("a", "1").unwrap();
        store.set_item("b", "2").unwrap();
        store.remove_item("a").unwrap();
        assert_eq!(FileStore::open(&path).unwrap().keys().unwrap(), vec!["b"]);

        store.clear().unwrap();
        assert!(FileStore::open(&path).unwrap().keys().unwrap().is_empty());
    }

    #[test]
    fn writers_on_one_file_keep_each_others_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");

        let first = FileStore::open(&path).unwrap();
        let second = FileStore::open(&path).unwrap();
        first.set_item("http://x/a", "[1,\"a\"]").unwrap();
        second.set_item("http://x/b", "[1,\"b\"]").unwrap();

        assert_eq!(
            FileStore::open(&path).unwrap().keys().unwrap(),
            vec!["http://x/a", "http://x/b"]
        );
        assert_eq!(first.get_item("http://x/b").unwrap().as_deref(), Some("[1,\"b\"]"));

        second.set_item("http://x/a", "[2,\"a2\"]").unwrap();
        assert_eq!(first.get_item("http://x/a").unwrap().as_deref(), Some("[2,\"a2\"]"));
    }

    #[test]
    fn corrupt_file_reads_empty_and_is_replaced() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        fs::write(&path, "garbage").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(store.keys().unwrap().is_empty());
        assert_eq!(store.get_item("a").unwrap(), None);

        store.set_item("a", "1").unwrap();
        assert_eq!(FileStore::open(&path).unwrap().keys().unwrap(), vec!["a"]);
    }

    #[test]
    fn clear_replaces_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        fs::write(&path, "garbage").unwrap();

        FileStore::open(&path).unwrap().clear().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[cfg(unix)]
    #[test]
    fn store_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path().join("store.json")).unwrap();
        store.set_item("a", "1").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
