//! Synchronous client core for the digital-wallet pass service.
//!
//! # Overview
//! Typed create/get/update/delete calls for passes, templates and template
//! headers. `WalletClient` builds `HttpRequest` values and parses
//! `HttpResponse` values without touching the network (host-does-IO
//! pattern); `WalletApi` runs them over a `Transport` for callers that want
//! a plain blocking API.
//!
//! # Design
//! - `WalletClient` is stateless. It holds only the base URL and API key,
//!   taken from an explicit `ClientConfig`.
//! - Each operation is split into `build_*` (validates, produces a request)
//!   and `parse_*` (consumes a response), so the I/O boundary is explicit
//!   and the FFI crate can expose both halves to a C host.
//! - No operation mutates its inputs; `update_pass` returns a new `Pass`.
//! - Payloads are ordered JSON objects end to end.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use api::WalletApi;
pub use client::WalletClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, StreamingResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{FieldMap, NewTemplate, Pass, Template, TemplateHeader, TemplateRef};
