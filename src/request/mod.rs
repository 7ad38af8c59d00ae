//! HTTP request layer
//!
//! Issues a single HTTP call through a [`Transport`] and turns any
//! non-2xx status into [`QuarryError::HttpStatus`]. Transport failures
//! propagate unchanged. Nothing here retries.

pub mod client;
pub mod guard;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{Api, HttpClient};
pub use guard::{in_flight_key, InFlight, InFlightRegistry};
pub use transport::UreqTransport;

use crate::error::{QuarryError, QuarryResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Header map, ordered for stable output
pub type Headers = BTreeMap<String, String>;

/// HTTP request method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            other => Err(QuarryError::User(format!("Unsupported HTTP method: {}", other))),
        }
    }
}

/// Per-request configuration: method, headers and body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestConfig {
    pub method: Method,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

impl RequestConfig {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A fully specified request handed to a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>, config: RequestConfig) -> Self {
        Self {
            method: config.method,
            url: url.into(),
            headers: config.headers,
            body: config.body,
        }
    }
}

/// A settled response, successful or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// URL the request was sent to
    pub url: String,
    pub status: u16,
    /// Header names are lower-case
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Decode the body as UTF-8 text
    pub fn text(&self) -> QuarryResult<String> {
        String::from_utf8(self.body.clone()).map_err(|e| QuarryError::Decode {
            url: self.url.clone(),
            reason: e.to_string(),
        })
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> QuarryResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| QuarryError::Decode {
            url: self.url.clone(),
            reason: e.to_string(),
        })
    }
}

/// Something that can put a request on the wire
///
/// Implementations report every settled response as `Ok`, whatever its
/// status; only transport-level failures are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> QuarryResult<HttpResponse>;
}

/// Issue one HTTP call, rejecting non-2xx responses with the full response
pub async fn perform_request(
    transport: &dyn Transport,
    url: &str,
    config: RequestConfig,
) -> QuarryResult<HttpResponse> {
    let request = HttpRequest::new(url, config);
    debug!("{} {}", request.method, request.url);

    let response = transport.send(request).await?;

    if !response.is_success() {
        debug!("{} responded with status {}", url, response.status);
        return Err(QuarryError::HttpStatus(Box::new(response)));
    }

    Ok(response)
}
