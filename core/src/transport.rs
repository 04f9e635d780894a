//! Executing `HttpRequest` values.
//!
//! `Transport` is the seam between the pure build/parse core and the
//! network. `UreqTransport` is the blocking default; tests and hosts with
//! their own HTTP stack plug in their own implementation.

use std::time::Duration;

use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, StreamingResponse};

pub trait Transport {
    /// Send `request` and return the response with its body unread.
    ///
    /// Non-2xx statuses are returned as data, not as `Err`; status
    /// interpretation belongs to the caller.
    fn send(&self, request: &HttpRequest) -> Result<StreamingResponse, ApiError>;

    /// Send `request` and buffer the whole body.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.send(request)?.into_buffered()
    }
}

/// Blocking transport backed by a `ureq` agent.
///
/// The agent is configured with `http_status_as_error(false)` so 4xx/5xx
/// responses come back as data for the core to interpret.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<StreamingResponse, ApiError> {
        let body = request.body.as_deref().unwrap_or_default().as_bytes();
        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(&request.path), &request.headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(&request.path), &request.headers).call(),
            HttpMethod::Post => with_headers(self.agent.post(&request.path), &request.headers).send(body),
            HttpMethod::Put => with_headers(self.agent.put(&request.path), &request.headers).send(body),
        };
        let response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        debug!(status, path = request.redacted_path(), "response received");
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();

        Ok(StreamingResponse {
            status,
            headers,
            body: Box::new(response.into_body().into_reader()),
        })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
