//! Blocking wallet API: one call, one round trip.
//!
//! `WalletApi` pairs a `WalletClient` with a `Transport`. Each method runs
//! `build_*`, sends the request, and hands the response to `parse_*`. An
//! invalid parameter is detected by `build_*`, so it never reaches the
//! transport.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::client::WalletClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, StreamingResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{FieldMap, NewTemplate, Pass, Template, TemplateHeader, TemplateRef};

pub struct WalletApi<T = UreqTransport> {
    client: WalletClient,
    transport: T,
}

impl WalletApi<UreqTransport> {
    /// Client over the default blocking transport, honoring the configured
    /// timeout.
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new(config.timeout))
    }
}

impl<T: Transport> WalletApi<T> {
    pub fn with_transport(config: &ClientConfig, transport: T) -> Self {
        Self {
            client: WalletClient::from_config(config),
            transport,
        }
    }

    pub fn client(&self) -> &WalletClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // Passes
    // -----------------------------------------------------------------------

    pub fn create_pass(&self, template_id: u64, fields: &FieldMap) -> Result<Pass, ApiError> {
        let request = self.client.build_create_pass(template_id, fields)?;
        self.client.parse_create_pass(template_id, self.execute(&request)?)
    }

    /// Push `pass.fields` to the server and return the pass with its new URL.
    pub fn update_pass(&self, pass: &Pass) -> Result<Pass, ApiError> {
        let request = self.client.build_update_pass(pass)?;
        self.client.parse_update_pass(pass, self.execute(&request)?)
    }

    pub fn get_pass(&self, pass_id: u64) -> Result<Pass, ApiError> {
        let request = self.client.build_get_pass(pass_id);
        self.client.parse_get_pass(self.execute(&request)?)
    }

    /// Stream the rendered pass file into `destination` and return the number
    /// of bytes written.
    ///
    /// `destination` is consumed: it and the response body are dropped on
    /// every return path. A failed write leaves whatever was already written;
    /// nothing is retried or rolled back.
    pub fn download_pass<W: Write>(&self, pass_id: u64, destination: W) -> Result<u64, ApiError> {
        let response = self.open_download(pass_id)?;
        copy_body(response.body, destination)
    }

    /// Like `download_pass`, writing to `path`. The file is created (or
    /// truncated) only once the server has answered with a success status.
    pub fn download_pass_to_file(&self, pass_id: u64, path: impl AsRef<Path>) -> Result<u64, ApiError> {
        let response = self.open_download(pass_id)?;
        let file = File::create(path.as_ref())?;
        copy_body(response.body, file)
    }

    fn open_download(&self, pass_id: u64) -> Result<StreamingResponse, ApiError> {
        let request = self.client.build_download_pass(pass_id);
        let response = self.send(&request)?;
        if !response.is_success() {
            let failed = response.into_buffered()?;
            return Err(ApiError::Http {
                status: failed.status,
                body: failed.body,
            });
        }
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    /// Returns the new template id, or `None` when the server did not report
    /// a usable one.
    pub fn create_template(&self, template: &NewTemplate) -> Result<Option<u64>, ApiError> {
        let request = self.client.build_create_template(template)?;
        self.client.parse_create_template(self.execute(&request)?)
    }

    pub fn create_template_with_external_id(
        &self,
        external_id: &str,
        template: &NewTemplate,
    ) -> Result<Option<u64>, ApiError> {
        let request = self.client.build_create_template_with_external_id(external_id, template)?;
        self.client.parse_create_template(self.execute(&request)?)
    }

    pub fn get_template(&self, target: impl Into<TemplateRef>) -> Result<Template, ApiError> {
        let request = self.client.build_get_template(&target.into())?;
        self.client.parse_get_template(self.execute(&request)?)
    }

    pub fn update_template(&self, target: impl Into<TemplateRef>, template: &NewTemplate) -> Result<(), ApiError> {
        let request = self.client.build_update_template(&target.into(), template)?;
        self.client.parse_update_template(self.execute(&request)?)
    }

    pub fn duplicate_template(&self, target: impl Into<TemplateRef>) -> Result<Option<u64>, ApiError> {
        let request = self.client.build_duplicate_template(&target.into())?;
        self.client.parse_create_template(self.execute(&request)?)
    }

    pub fn delete_template(&self, target: impl Into<TemplateRef>) -> Result<(), ApiError> {
        let request = self.client.build_delete_template(&target.into())?;
        self.client.parse_delete_template(self.execute(&request)?)
    }

    pub fn list_template_headers(&self) -> Result<Vec<TemplateHeader>, ApiError> {
        let request = self.client.build_list_template_headers();
        self.client.parse_list_template_headers(self.execute(&request)?)
    }

    // -----------------------------------------------------------------------

    fn send(&self, request: &HttpRequest) -> Result<StreamingResponse, ApiError> {
        debug!(method = %request.method, path = request.redacted_path(), "sending request");
        self.transport.send(request)
    }

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, path = request.redacted_path(), "sending request");
        self.transport.execute(request)
    }
}

/// Copy `source` into `destination`, then flush. Both are dropped when this
/// returns, whichever way it returns.
fn copy_body<R: Read, W: Write>(mut source: R, mut destination: W) -> Result<u64, ApiError> {
    let copied = io::copy(&mut source, &mut destination)?;
    destination.flush()?;
    Ok(copied)
}
