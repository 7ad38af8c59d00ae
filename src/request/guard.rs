//! Concurrency guard for in-flight requests
//!
//! At most one unsettled request may exist per `METHOD URL` key. A second
//! identical request is refused with [`QuarryError::Concurrency`] rather
//! than coalesced onto the first one.

use super::Method;
use crate::error::{QuarryError, QuarryResult};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Key identifying an in-flight request: `METHOD URL`
pub fn in_flight_key(method: Method, url: &str) -> String {
    format!("{} {}", method, url)
}

/// Set of currently unsettled request keys.
///
/// Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, failing immediately if it is already claimed.
    ///
    /// Check and insert happen under one lock, so two callers can never
    /// both succeed. The key is released when the returned permit drops.
    pub fn acquire(&self, key: String) -> QuarryResult<InFlight> {
        let mut keys = self.lock();

        if keys.contains(&key) {
            debug!("Refusing duplicate request {}", key);
            return Err(QuarryError::Concurrency { key });
        }

        keys.insert(key.clone());
        debug!("Request {} in flight", key);

        Ok(InFlight {
            keys: Arc::clone(&self.keys),
            key,
        })
    }

    /// Whether `key` is currently unsettled
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    /// Number of unsettled requests
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Claim on an in-flight key, released on drop.
///
/// Dropping covers success, failure and a future abandoned mid-flight.
#[derive(Debug)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlight {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
        debug!("Request {} settled", self.key);
    }
}
