//! Registered descriptors and resolution specs

use crate::error::QuarryResult;
use crate::request::{HttpResponse, Method, RequestConfig};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Lifespan used by [`ResolutionSpec::cached`], in seconds
pub const DEFAULT_LIFESPAN_SECS: u64 = 3600;

/// Largest integer a lifespan may be (2^53 - 1)
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Post-response transform; its output is what gets cached
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

type MemoryFactory = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;
type SpecFactory = Arc<dyn Fn(&[Value]) -> QuarryResult<ResolutionSpec> + Send + Sync>;

/// In-memory resource: a plain value or a function of the query
#[derive(Clone)]
pub enum MemoryDescriptor {
    Static(Value),
    /// Called with the query on every resolution, never cached
    Factory(MemoryFactory),
}

impl MemoryDescriptor {
    pub fn value(value: impl Into<Value>) -> Self {
        MemoryDescriptor::Static(value.into())
    }

    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        MemoryDescriptor::Factory(Arc::new(f))
    }

    pub(crate) fn resolve(&self, query: &[Value]) -> Value {
        match self {
            MemoryDescriptor::Static(value) => value.clone(),
            MemoryDescriptor::Factory(f) => f(query),
        }
    }
}

impl From<Value> for MemoryDescriptor {
    fn from(value: Value) -> Self {
        MemoryDescriptor::Static(value)
    }
}

impl fmt::Debug for MemoryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryDescriptor::Static(value) => f.debug_tuple("Static").field(value).finish(),
            MemoryDescriptor::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Network resource: a fixed spec or a spec built from the query
#[derive(Clone)]
pub enum NetworkDescriptor {
    Static(ResolutionSpec),
    Factory(SpecFactory),
}

impl NetworkDescriptor {
    pub fn spec(spec: ResolutionSpec) -> Self {
        NetworkDescriptor::Static(spec)
    }

    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> QuarryResult<ResolutionSpec> + Send + Sync + 'static,
    {
        NetworkDescriptor::Factory(Arc::new(f))
    }

    pub(crate) fn build(&self, query: &[Value]) -> QuarryResult<ResolutionSpec> {
        match self {
            NetworkDescriptor::Static(spec) => Ok(spec.clone()),
            NetworkDescriptor::Factory(f) => f(query),
        }
    }
}

impl From<ResolutionSpec> for NetworkDescriptor {
    fn from(spec: ResolutionSpec) -> Self {
        NetworkDescriptor::Static(spec)
    }
}

impl fmt::Debug for NetworkDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkDescriptor::Static(spec) => f.debug_tuple("Static").field(spec).finish(),
            NetworkDescriptor::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// How a response body becomes a value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Json,
    /// Body as a JSON string
    Text,
}

impl ResponseFormat {
    pub(crate) fn decode(self, response: &HttpResponse) -> QuarryResult<Value> {
        match self {
            ResponseFormat::Json => response.json(),
            ResponseFormat::Text => response.text().map(Value::String),
        }
    }
}

/// A deferred network call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Also the cache key
    pub url: String,
    pub config: RequestConfig,
    pub format: ResponseFormat,
}

impl RequestDescriptor {
    pub fn new(url: impl Into<String>, config: RequestConfig, format: ResponseFormat) -> Self {
        Self {
            url: url.into(),
            config,
            format,
        }
    }

    /// GET with `Accept: application/json`, decoded as JSON
    pub fn json(url: impl Into<String>) -> Self {
        let config = RequestConfig::new(Method::Get).with_header("Accept", "application/json");
        Self::new(url, config, ResponseFormat::Json)
    }

    /// GET decoded as text
    pub fn text(url: impl Into<String>) -> Self {
        Self::new(url, RequestConfig::default(), ResponseFormat::Text)
    }
}

/// What a network descriptor yields for one resolution
#[derive(Clone)]
pub struct ResolutionSpec {
    pub request: RequestDescriptor,
    /// Identity when `None`
    pub transform: Option<Transform>,
    /// Seconds a cached result stays fresh; `None` disables the cache
    pub lifespan: Option<u64>,
}

impl ResolutionSpec {
    /// Uncached spec with the identity transform
    pub fn new(request: RequestDescriptor) -> Self {
        Self {
            request,
            transform: None,
            lifespan: None,
        }
    }

    /// Spec cached for [`DEFAULT_LIFESPAN_SECS`]
    pub fn cached(request: RequestDescriptor) -> Self {
        Self::new(request).with_default_lifespan()
    }

    pub fn with_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    /// Cache for `secs`; anything but a positive safe integer disables caching
    pub fn with_lifespan_secs(mut self, secs: i64) -> Self {
        self.lifespan = u64::try_from(secs)
            .ok()
            .filter(|secs| (1..=MAX_SAFE_INTEGER).contains(secs));
        self
    }

    pub fn with_default_lifespan(mut self) -> Self {
        self.lifespan = Some(DEFAULT_LIFESPAN_SECS);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.lifespan = None;
        self
    }
}

impl fmt::Debug for ResolutionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionSpec")
            .field("request", &self.request)
            .field("transform", &self.transform.as_ref().map(|_| ".."))
            .field("lifespan", &self.lifespan)
            .finish()
    }
}
