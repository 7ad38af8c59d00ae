//! Quarry - resource registry with a time-bounded persistent cache
//!
//! Callers register named resources and resolve them through opaque ids.
//! Memory resources resolve immediately; network resources go through a
//! persistent cache and an HTTP client that refuses duplicate in-flight
//! requests.

pub mod cli;
pub mod config;
pub mod error;
pub mod request;
pub mod resource;
pub mod storage;

pub use error::{QuarryError, QuarryResult};
pub use request::{HttpClient, HttpResponse, Method, RequestConfig, Transport};
pub use resource::{
    Identifier, MemoryDescriptor, NetworkDescriptor, Registry, RequestDescriptor, Resolution,
    ResolutionSpec, ResourceId, ResponseFormat,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageContext, StorageContexts};
