//! Resolution strategy for network resources
//!
//! Everything up to the HTTP call runs synchronously inside
//! [`Strategy::resolve`]: building the spec, the cache read and claiming
//! the in-flight key. The returned future only awaits the call itself,
//! then transforms and writes back.

use super::descriptor::{RequestDescriptor, ResolutionSpec, MAX_SAFE_INTEGER};
use crate::error::QuarryResult;
use crate::request::HttpClient;
use crate::storage::StorageContext;
use futures_util::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cache-then-network resolution
#[derive(Clone)]
pub struct Strategy {
    client: HttpClient,
    storage: Arc<StorageContext>,
}

impl Strategy {
    pub fn new(client: HttpClient, storage: Arc<StorageContext>) -> Self {
        Self { client, storage }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn storage(&self) -> &Arc<StorageContext> {
        &self.storage
    }

    /// Resolve `spec` to its transformed value.
    ///
    /// Request errors, `Concurrency` included, propagate and are never
    /// cached. A failed cache write is logged and the value still returned.
    pub fn resolve(&self, spec: ResolutionSpec) -> BoxFuture<'static, QuarryResult<Value>> {
        let ResolutionSpec {
            request,
            transform,
            lifespan,
        } = spec;

        // Only a positive safe integer enables caching, however the spec was built.
        let lifespan = lifespan.filter(|secs| (1..=MAX_SAFE_INTEGER).contains(secs));
        let Some(lifespan) = lifespan else {
            let pending = self.fetch(&request);
            return async move {
                let value = pending.await?;
                Ok(apply(transform.as_deref(), value))
            }
            .boxed();
        };

        match self.storage.read(&request.url, lifespan) {
            Ok(Some(cached)) => return future::ready(Ok(cached)).boxed(),
            Ok(None) => debug!("Cache miss for {}", request.url),
            Err(e) => return future::ready(Err(e)).boxed(),
        }

        let pending = self.fetch(&request);
        let storage = Arc::clone(&self.storage);
        let url = request.url;

        async move {
            let transformed = apply(transform.as_deref(), pending.await?);
            if let Err(e) = storage.write(&url, &transformed) {
                warn!("Failed to cache {}: {}", url, e);
            }
            Ok(transformed)
        }
        .boxed()
    }

    fn fetch(&self, request: &RequestDescriptor) -> BoxFuture<'static, QuarryResult<Value>> {
        let pending = self.client.request(&request.url, request.config.clone());
        let format = request.format;

        async move { format.decode(&pending.await?) }.boxed()
    }
}

fn apply(transform: Option<&(dyn Fn(Value) -> Value + Send + Sync)>, value: Value) -> Value {
    match transform {
        Some(f) => f(value),
        None => value,
    }
}
