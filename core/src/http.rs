//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `WalletClient` builds
//! `HttpRequest` values and parses `HttpResponse` values without touching
//! the network; whoever executes the request (a `Transport`, or a C host
//! through the FFI crate) owns the I/O.
//!
//! Bodies are form submissions with one field, `json`, carrying the
//! serialized payload. That is the only body shape the wallet service
//! accepts.

use std::fmt;
use std::io::Read;

use serde_json::Value;

use crate::error::ApiError;

/// Content type of every request body sent to the wallet service.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Name of the single form field holding the JSON payload.
pub const JSON_FORM_FIELD: &str = "json";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `path` is the absolute URL, including the `api_key` query parameter when
/// the client was configured with one.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// The URL without its query string. Safe to log.
    pub fn redacted_path(&self) -> &str {
        self.path.split('?').next().unwrap_or(&self.path)
    }

    /// Decode the `json` form field of the body back into a JSON value.
    ///
    /// Returns `None` for body-less requests or bodies without the field.
    pub fn json_payload(&self) -> Option<Result<Value, ApiError>> {
        let body = self.body.as_deref()?;
        let (_, raw) = form_urlencoded::parse(body.as_bytes()).find(|(k, _)| k == JSON_FORM_FIELD)?;
        Some(serde_json::from_str(&raw).map_err(|e| ApiError::Deserialization(e.to_string())))
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON. Parsing happens on each call; the raw body
    /// stays available for diagnostics.
    pub fn json(&self) -> Result<Value, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

/// A response whose body has not been read yet.
///
/// Used for pass downloads, where the body is copied straight into a sink
/// instead of being buffered as a string.
pub struct StreamingResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Box<dyn Read>,
}

impl StreamingResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Buffer the whole body into an `HttpResponse`. Invalid UTF-8 is
    /// replaced rather than failing, so the status always survives.
    pub fn into_buffered(mut self) -> Result<HttpResponse, ApiError> {
        let mut bytes = Vec::new();
        self.body.read_to_end(&mut bytes)?;
        Ok(HttpResponse {
            status: self.status,
            headers: self.headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

impl fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Encode a JSON payload as the `json=<...>` form body.
pub(crate) fn encode_form(payload: &Value) -> Result<String, ApiError> {
    let json = serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
    Ok(form_urlencoded::Serializer::new(String::new())
        .append_pair(JSON_FORM_FIELD, &json)
        .finish())
}
