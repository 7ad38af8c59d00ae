//! Blocking `ureq` transport driven from tokio's blocking pool

use super::{Headers, HttpRequest, HttpResponse, Transport};
use crate::config::{HttpConfig, DEFAULT_MAX_BODY_BYTES};
use crate::error::{QuarryError, QuarryResult};
use async_trait::async_trait;
use std::time::Duration;
use ureq::Agent;

/// Production transport.
///
/// Status codes are never errors at this level; `perform_request` decides.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
    user_agent: String,
    max_body_bytes: u64,
}

impl UreqTransport {
    /// Create a transport with an optional global timeout
    pub fn new(timeout: Option<Duration>, user_agent: impl Into<String>) -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .into();

        Self {
            agent,
            user_agent: user_agent.into(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Cap response bodies at `limit` bytes
    pub fn with_max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Create a transport from the `[http]` config section
    pub fn from_config(config: &HttpConfig) -> Self {
        let timeout = match config.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self::new(timeout, config.user_agent.clone()).with_max_body_bytes(config.max_body_bytes)
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn send(&self, request: HttpRequest) -> QuarryResult<HttpResponse> {
        let transport = self.clone();

        tokio::task::spawn_blocking(move || transport.execute(request))
            .await
            .map_err(|e| QuarryError::Internal(format!("request task failed: {}", e)))?
    }
}

impl UreqTransport {
    fn execute(&self, request: HttpRequest) -> QuarryResult<HttpResponse> {
        let url = request.url;
        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(url.as_str());

        if !request
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("user-agent"))
        {
            builder = builder.header("User-Agent", self.user_agent.as_str());
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let sent = match request.body {
            Some(body) => builder.body(body).map(|req| self.agent.run(req)),
            None => builder.body(()).map(|req| self.agent.run(req)),
        };
        let mut response = sent
            .map_err(|e| QuarryError::transport(&url, e))?
            .map_err(|e| QuarryError::transport(&url, e))?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let limit = self.max_body_bytes;
        let body = response
            .body_mut()
            .with_config()
            .limit(limit)
            .read_to_vec()
            .map_err(|e| match e {
                ureq::Error::BodyExceedsLimit(_) => QuarryError::BodyTooLarge {
                    url: url.clone(),
                    limit,
                },
                e => QuarryError::transport(&url, e),
            })?;

        Ok(HttpResponse {
            url,
            status,
            headers,
            body,
        })
    }
}
