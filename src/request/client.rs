//! Guarded HTTP client
//!
//! Every call claims its in-flight key synchronously, before the returned
//! future is first polled. A duplicate call therefore fails even if the
//! first one has not been awaited yet.

use super::guard::{in_flight_key, InFlightRegistry};
use super::{perform_request, HttpResponse, Method, RequestConfig, Transport};
use crate::error::QuarryResult;
use futures_util::future::{self, BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const MIME_JSON: &str = "application/json";

/// HTTP client with the duplicate-request guard applied
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    in_flight: InFlightRegistry,
}

impl HttpClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            in_flight: InFlightRegistry::new(),
        }
    }

    /// Share an existing in-flight set with another client
    pub fn with_in_flight(transport: Arc<dyn Transport>, in_flight: InFlightRegistry) -> Self {
        Self {
            transport,
            in_flight,
        }
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    /// Issue a guarded request.
    ///
    /// Fails with `Concurrency` when an identical request is unsettled.
    /// The key is released once the call settles, whatever the outcome.
    pub fn request(
        &self,
        url: &str,
        config: RequestConfig,
    ) -> BoxFuture<'static, QuarryResult<HttpResponse>> {
        let permit = match self.in_flight.acquire(in_flight_key(config.method, url)) {
            Ok(permit) => permit,
            Err(e) => return future::ready(Err(e)).boxed(),
        };

        let transport = Arc::clone(&self.transport);
        let url = url.to_string();

        async move {
            let _permit = permit;
            perform_request(transport.as_ref(), &url, config).await
        }
        .boxed()
    }

    /// GET `url` as JSON
    pub fn json(&self, url: &str) -> BoxFuture<'static, QuarryResult<Value>> {
        let config = RequestConfig::default().with_header("Accept", MIME_JSON);
        let pending = self.request(url, config);

        async move { pending.await?.json() }.boxed()
    }

    /// GET `url` as text
    pub fn text(&self, url: &str) -> BoxFuture<'static, QuarryResult<String>> {
        let pending = self.request(url, RequestConfig::default());

        async move { pending.await?.text() }.boxed()
    }

    /// Verb helpers returning the raw response
    pub fn api(&self) -> Api<'_> {
        Api { client: self }
    }
}

/// REST-style helpers; bodies are serialized as JSON
pub struct Api<'a> {
    client: &'a HttpClient,
}

impl Api<'_> {
    pub fn get(&self, url: &str) -> BoxFuture<'static, QuarryResult<HttpResponse>> {
        self.client.request(url, RequestConfig::new(Method::Get))
    }

    pub fn delete(&self, url: &str) -> BoxFuture<'static, QuarryResult<HttpResponse>> {
        self.client.request(url, RequestConfig::new(Method::Delete))
    }

    pub fn post<T: Serialize>(
        &self,
        url: &str,
        data: &T,
    ) -> BoxFuture<'static, QuarryResult<HttpResponse>> {
        self.with_body(Method::Post, url, data)
    }

    pub fn put<T: Serialize>(
        &self,
        url: &str,
        data: &T,
    ) -> BoxFuture<'static, QuarryResult<HttpResponse>> {
        self.with_body(Method::Put, url, data)
    }

    pub fn patch<T: Serialize>(
        &self,
        url: &str,
        data: &T,
    ) -> BoxFuture<'static, QuarryResult<HttpResponse>> {
        self.with_body(Method::Patch, url, data)
    }

    fn with_body<T: Serialize>(
        &self,
        method: Method,
        url: &str,
        data: &T,
    ) -> BoxFuture<'static, QuarryResult<HttpResponse>> {
        let body = match serde_json::to_vec(data) {
            Ok(body) => body,
            Err(e) => return future::ready(Err(e.into())).boxed(),
        };
        let config = RequestConfig::new(method)
            .with_header("Content-Type", MIME_JSON)
            .with_body(body);

        self.client.request(url, config)
    }
}
