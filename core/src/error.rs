//! Error types for the wallet API client.
//!
//! # Design
//! Two tiers. `InvalidParameter` signals caller misuse and is always raised
//! before any request leaves the process. Every other variant is an
//! operation failure; the variant itself is the wrapped cause, so callers
//! that only care about the tier use `is_invalid_parameter`.

use thiserror::Error;

/// Errors returned by the wallet client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required argument was missing or empty. No request was sent.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced a response (connect, TLS, protocol).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body was not the JSON shape the operation expects.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Reading the response stream or writing the download sink failed.
    #[error("i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ApiError::InvalidParameter(msg.into())
    }

    /// True for caller misuse, false for every operation failure.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, ApiError::InvalidParameter(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_distinguishable() {
        assert!(ApiError::invalid("pass id").is_invalid_parameter());
        let failure = ApiError::Http {
            status: 500,
            body: "boom".to_string(),
        };
        assert!(!failure.is_invalid_parameter());
        assert_eq!(failure.to_string(), "HTTP 500: boom");
    }

    #[test]
    fn io_errors_convert() {
        let err: ApiError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed").into();
        assert!(matches!(err, ApiError::Io(_)));
        assert!(!err.is_invalid_parameter());
    }
}
