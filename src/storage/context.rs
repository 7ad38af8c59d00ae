//! Timestamped read/write context bound to one store

use super::{Clock, KeyValueStore};
use crate::error::QuarryResult;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Read/write pair bound to a single store
pub struct StorageContext {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

/// Summary of one stored entry
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntryInfo {
    pub key: String,
    pub stored_at: DateTime<Utc>,
}

impl StorageContext {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Value stored under `key` if younger than `max_age_secs`.
    ///
    /// Absent, stale and unreadable entries are all `None`. Stale entries
    /// are left in place for the next write to replace.
    pub fn read(&self, key: &str, max_age_secs: u64) -> QuarryResult<Option<Value>> {
        let Some(raw) = self.store.get_item(key)? else {
            return Ok(None);
        };

        // A corrupt entry counts as a miss and is overwritten on the next write.
        let (timestamp, value) = match serde_json::from_str::<(i64, Value)>(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", key, e);
                return Ok(None);
            }
        };

        let elapsed_ms = i128::from(self.clock.now_millis()) - i128::from(timestamp);
        if elapsed_ms < i128::from(max_age_secs) * 1000 {
            debug!("Cache hit for {}", key);
            Ok(Some(value))
        } else {
            debug!("Cache entry {} is stale", key);
            Ok(None)
        }
    }

    /// Store `value` under `key` with the current timestamp
    pub fn write(&self, key: &str, value: &Value) -> QuarryResult<()> {
        let entry = serde_json::to_string(&(self.clock.now_millis(), value))?;
        self.store.set_item(key, &entry)?;
        debug!("Cached {}", key);
        Ok(())
    }

    pub fn remove(&self, key: &str) -> QuarryResult<()> {
        self.store.remove_item(key)
    }

    pub fn clear(&self) -> QuarryResult<()> {
        self.store.clear()
    }

    /// Readable entries with their timestamps; unreadable ones are skipped
    pub fn entries(&self) -> QuarryResult<Vec<CacheEntryInfo>> {
        let mut entries = Vec::new();

        for key in self.store.keys()? {
            let Some(raw) = self.store.get_item(&key)? else {
                continue;
            };
            let Ok((timestamp, _)) = serde_json::from_str::<(i64, Value)>(&raw) else {
                continue;
            };
            if let Some(stored_at) = DateTime::<Utc>::from_timestamp_millis(timestamp) {
                entries.push(CacheEntryInfo { key, stored_at });
            }
        }

        Ok(entries)
    }
}

/// Hands out one shared [`StorageContext`] per store instance
pub struct StorageContexts {
    clock: Arc<dyn Clock>,
    contexts: Mutex<Vec<Arc<StorageContext>>>,
}

impl StorageContexts {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// The context bound to `store`, created on first use
    pub fn context(&self, store: &Arc<dyn KeyValueStore>) -> Arc<StorageContext> {
        let mut contexts = self.contexts.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = contexts.iter().find(|c| Arc::ptr_eq(&c.store, store)) {
            return Arc::clone(existing);
        }

        let context = Arc::new(StorageContext::new(
            Arc::clone(store),
            Arc::clone(&self.clock),
        ));
        contexts.push(Arc::clone(&context));
        context
    }
}
