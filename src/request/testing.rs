//! Scripted transport for unit tests

use super::{Headers, HttpRequest, HttpResponse, Transport};
use crate::error::{QuarryError, QuarryResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Answers requests from a fixed table keyed by URL.
///
/// Unknown URLs fail like a refused connection. With a gate, every send
/// waits for one permit before answering.
#[derive(Default)]
pub(crate) struct MockTransport {
    responses: HashMap<String, (u16, Vec<u8>)>,
    sent: Mutex<Vec<HttpRequest>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, url: &str, status: u16, body: &str) -> Self {
        self.responses
            .insert(url.to_string(), (status, body.as_bytes().to_vec()));
        self
    }

    pub(crate) fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> QuarryResult<HttpResponse> {
        self.sent.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let (status, body) = self.responses.get(&request.url).cloned().ok_or_else(|| {
            QuarryError::transport(
                &request.url,
                io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            )
        })?;

        Ok(HttpResponse {
            url: request.url,
            status,
            headers: Headers::new(),
            body,
        })
    }
}
