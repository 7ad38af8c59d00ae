//! Persistent cache storage
//!
//! A flat, synchronous, string-keyed key/value medium plus the
//! timestamped read/write context layered on top of it.
//!
//! # Entry format
//!
//! Each entry is stored as the JSON array `[timestampMillis, value]`
//! under its key. An entry is fresh while
//! `(now - timestampMillis) / 1000 < maxAgeSeconds`.

pub mod clock;
pub mod context;
pub mod file;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{CacheEntryInfo, StorageContext, StorageContexts};
pub use file::FileStore;

use crate::error::QuarryResult;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Synchronous string key/value store supplied by the host
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> QuarryResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> QuarryResult<()>;

    fn remove_item(&self, key: &str) -> QuarryResult<()>;

    /// All keys, sorted
    fn keys(&self) -> QuarryResult<Vec<String>>;

    fn clear(&self) -> QuarryResult<()>;
}

/// Process-local store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> QuarryResult<Option<String>> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> QuarryResult<()> {
        self.items().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> QuarryResult<()> {
        self.items().remove(key);
        Ok(())
    }

    fn keys(&self) -> QuarryResult<Vec<String>> {
        Ok(self.items().keys().cloned().collect())
    }

    fn clear(&self) -> QuarryResult<()> {
        self.items().clear();
        Ok(())
    }
}
