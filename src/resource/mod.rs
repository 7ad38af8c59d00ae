//! Resource registry
//!
//! Resources are registered into one of two namespaces and addressed by
//! opaque [`ResourceId`]s:
//!
//! - **memory**: plain values, or functions of the query called on every
//!   resolution
//! - **network**: descriptors yielding a [`ResolutionSpec`], resolved
//!   through the cache and the guarded HTTP client
//!
//! # Network resolution
//!
//! ```text
//! Idle -> SpecBuilt -> CacheChecked
//!   CacheHit  -> Resolved
//!   CacheMiss -> GuardRejected
//!             -> Requesting -> RequestFailed
//!                           -> Transformed -> CacheWritten -> Resolved
//! ```

pub mod descriptor;
pub mod id;
pub mod strategy;

pub use descriptor::{
    MemoryDescriptor, NetworkDescriptor, RequestDescriptor, ResolutionSpec, ResponseFormat,
    Transform, DEFAULT_LIFESPAN_SECS,
};
pub use id::{Identifier, ResourceId};
pub use strategy::Strategy;

use crate::error::{QuarryError, QuarryResult};
use crate::request::{HttpClient, Transport};
use crate::storage::StorageContext;
use futures_util::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::IntoFuture;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Outcome of [`Registry::resolve`]: memory resources are ready at once,
/// network resources are pending. Both can be awaited.
pub enum Resolution {
    Ready(Value),
    Pending(BoxFuture<'static, QuarryResult<Value>>),
}

impl Resolution {
    pub fn is_ready(&self) -> bool {
        matches!(self, Resolution::Ready(_))
    }

    /// The value, if no await is needed
    pub fn into_ready(self) -> Option<Value> {
        match self {
            Resolution::Ready(value) => Some(value),
            Resolution::Pending(_) => None,
        }
    }
}

impl IntoFuture for Resolution {
    type Output = QuarryResult<Value>;
    type IntoFuture = BoxFuture<'static, QuarryResult<Value>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Resolution::Ready(value) => future::ready(Ok(value)).boxed(),
            Resolution::Pending(pending) => pending,
        }
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Resolution::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Registry of memory and network resources.
///
/// Build one at startup and share it by reference.
pub struct Registry {
    memory: RwLock<HashMap<ResourceId, MemoryDescriptor>>,
    network: RwLock<HashMap<ResourceId, NetworkDescriptor>>,
    strategy: Strategy,
}

impl Registry {
    pub fn new(client: HttpClient, storage: Arc<StorageContext>) -> Self {
        Self::with_strategy(Strategy::new(client, storage))
    }

    /// Registry with its own guarded client over `transport`
    pub fn with_transport(transport: Arc<dyn Transport>, storage: Arc<StorageContext>) -> Self {
        Self::new(HttpClient::new(transport), storage)
    }

    pub fn with_strategy(strategy: Strategy) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            network: RwLock::new(HashMap::new()),
            strategy,
        }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Register in-memory resources, returning their ids in order
    pub fn register_memory<I, N, D>(&self, entries: I) -> Vec<ResourceId>
    where
        I: IntoIterator<Item = (N, D)>,
        N: AsRef<str>,
        D: Into<MemoryDescriptor>,
    {
        let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);

        entries
            .into_iter()
            .map(|(name, descriptor)| {
                let id = ResourceId::new(name.as_ref());
                debug!("Registered memory resource {}", id);
                memory.insert(id.clone(), descriptor.into());
                id
            })
            .collect()
    }

    /// Register network resources, returning their ids in order
    pub fn register_network<I, N, D>(&self, entries: I) -> Vec<ResourceId>
    where
        I: IntoIterator<Item = (N, D)>,
        N: AsRef<str>,
        D: Into<NetworkDescriptor>,
    {
        let mut network = self.network.write().unwrap_or_else(PoisonError::into_inner);

        entries
            .into_iter()
            .map(|(name, descriptor)| {
                let id = ResourceId::new(name.as_ref());
                debug!("Registered network resource {}", id);
                network.insert(id.clone(), descriptor.into());
                id
            })
            .collect()
    }

    /// Whether `id` is registered in either namespace
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.memory_descriptor(id).is_some() || self.network_descriptor(id).is_some()
    }

    /// Resolve `id` with `query`.
    ///
    /// Memory resources come back `Ready`. Network resources come back
    /// `Pending`, with the cache already consulted and the in-flight key
    /// already claimed.
    pub fn resolve<'a>(
        &self,
        id: impl Into<Identifier<'a>>,
        query: &[Value],
    ) -> QuarryResult<Resolution> {
        let id = match id.into() {
            Identifier::Id(id) => id,
            Identifier::Raw(raw) => {
                return Err(QuarryError::InvalidIdentifier {
                    given: raw.to_string(),
                })
            }
        };

        // Descriptors are cloned out so user callbacks run without a lock held.
        if let Some(descriptor) = self.memory_descriptor(id) {
            return Ok(Resolution::Ready(descriptor.resolve(query)));
        }

        if let Some(descriptor) = self.network_descriptor(id) {
            let spec = descriptor.build(query)?;
            debug!("Resolving {} via {}", id, spec.request.url);
            return Ok(Resolution::Pending(self.strategy.resolve(spec)));
        }

        Err(QuarryError::UnknownResource(id.to_string()))
    }

    /// Resolve and await in one step
    pub async fn fetch<'a>(
        &self,
        id: impl Into<Identifier<'a>>,
        query: &[Value],
    ) -> QuarryResult<Value> {
        self.resolve(id, query)?.await
    }

    fn memory_descriptor(&self, id: &ResourceId) -> Option<MemoryDescriptor> {
        self.memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn network_descriptor(&self, id: &ResourceId) -> Option<NetworkDescriptor> {
        self.network
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}
