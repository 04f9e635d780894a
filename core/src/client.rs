//! Stateless HTTP request builder and response parser for the wallet API.
//!
//! # Design
//! `WalletClient` holds only the base URL and the optional API key. Each
//! operation is split into a `build_*` method that produces an `HttpRequest`
//! and a `parse_*` method that consumes an `HttpResponse`. Argument checks
//! live in the `build_*` half, so an invalid parameter is always reported
//! before any I/O happens. `WalletApi` glues the halves to a `Transport`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{encode_form, HttpMethod, HttpRequest, HttpResponse, FORM_CONTENT_TYPE};
use crate::types::{
    numeric_id, FieldMap, NewTemplate, Pass, PassBody, PassUrlBody, Template, TemplateBody, TemplateHeader,
    TemplateHeadersBody, TemplateIdBody, TemplateRef,
};

/// Synchronous, stateless request builder and response parser for the
/// wallet service.
#[derive(Debug, Clone)]
pub struct WalletClient {
    base_url: String,
    api_key: Option<String>,
}

impl WalletClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            ..Self::new(&config.base_url)
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Passes
    // -----------------------------------------------------------------------

    pub fn build_create_pass(&self, template_id: u64, fields: &FieldMap) -> Result<HttpRequest, ApiError> {
        self.form_request(HttpMethod::Post, &format!("/pass/{template_id}"), fields)
    }

    /// The returned pass carries `template_id`, since the create response
    /// does not echo it.
    pub fn parse_create_pass(&self, template_id: u64, response: HttpResponse) -> Result<Pass, ApiError> {
        let body: PassBody = parse_json(&response)?;
        Ok(Pass {
            pass_id: Some(body.id),
            template_id: Some(template_id),
            url: body.url,
            fields: body.pass_fields.unwrap_or_default(),
        })
    }

    pub fn build_update_pass(&self, pass: &Pass) -> Result<HttpRequest, ApiError> {
        let pass_id = pass
            .pass_id
            .ok_or_else(|| ApiError::invalid("pass has no pass id; fetch or create it first"))?;
        self.form_request(HttpMethod::Put, &format!("/pass/{pass_id}"), &pass.fields)
    }

    /// Returns a copy of `pass` with the URL reported by the server. The
    /// input is left untouched.
    pub fn parse_update_pass(&self, pass: &Pass, response: HttpResponse) -> Result<Pass, ApiError> {
        let body: PassUrlBody = parse_json(&response)?;
        Ok(Pass {
            url: body.url,
            ..pass.clone()
        })
    }

    pub fn build_get_pass(&self, pass_id: u64) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/pass/{pass_id}"))
    }

    pub fn parse_get_pass(&self, response: HttpResponse) -> Result<Pass, ApiError> {
        let body: PassBody = parse_json(&response)?;
        Ok(Pass {
            pass_id: Some(body.id),
            template_id: body.template_id,
            url: body.url,
            fields: body.pass_fields.unwrap_or_default(),
        })
    }

    /// The response body is the raw pass file; there is no `parse_*`
    /// counterpart.
    pub fn build_download_pass(&self, pass_id: u64) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/pass/{pass_id}/download"))
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    pub fn build_create_template(&self, template: &NewTemplate) -> Result<HttpRequest, ApiError> {
        self.form_request(HttpMethod::Post, "/template/", template)
    }

    pub fn build_create_template_with_external_id(
        &self,
        external_id: &str,
        template: &NewTemplate,
    ) -> Result<HttpRequest, ApiError> {
        let target = TemplateRef::External(external_id.to_string());
        let segment = checked_segment(&target)?;
        self.form_request(HttpMethod::Post, &format!("/template/{segment}"), template)
    }

    /// Shared by create, create-with-external-id and duplicate.
    ///
    /// An absent `templateId` yields `None`. A present but non-numeric one
    /// also yields `None` and is logged, rather than failing a call whose
    /// side effect already happened on the server.
    pub fn parse_create_template(&self, response: HttpResponse) -> Result<Option<u64>, ApiError> {
        let body: TemplateIdBody = parse_json(&response)?;
        match body.template_id {
            None | Some(Value::Null) => Ok(None),
            Some(raw) => {
                let id = numeric_id(&raw);
                if id.is_none() {
                    warn!(template_id = %raw, "server returned a non-numeric template id");
                }
                Ok(id)
            }
        }
    }

    pub fn build_get_template(&self, target: &TemplateRef) -> Result<HttpRequest, ApiError> {
        let segment = checked_segment(target)?;
        Ok(self.request(HttpMethod::Get, &format!("/template/{segment}")))
    }

    pub fn parse_get_template(&self, response: HttpResponse) -> Result<Template, ApiError> {
        let body: TemplateBody = parse_json(&response)?;
        Ok(Template {
            header: body.template_header.unwrap_or_default(),
            fields_model: body.fields_model.unwrap_or_default(),
        })
    }

    pub fn build_update_template(&self, target: &TemplateRef, template: &NewTemplate) -> Result<HttpRequest, ApiError> {
        let segment = checked_segment(target)?;
        self.form_request(HttpMethod::Put, &format!("/template/{segment}"), template)
    }

    pub fn parse_update_template(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn build_duplicate_template(&self, target: &TemplateRef) -> Result<HttpRequest, ApiError> {
        let segment = checked_segment(target)?;
        Ok(self.request(HttpMethod::Post, &format!("/template/duplicate/{segment}")))
    }

    pub fn build_delete_template(&self, target: &TemplateRef) -> Result<HttpRequest, ApiError> {
        let segment = checked_segment(target)?;
        Ok(self.request(HttpMethod::Delete, &format!("/template/{segment}")))
    }

    pub fn parse_delete_template(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn build_list_template_headers(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/template/headers")
    }

    pub fn parse_list_template_headers(&self, response: HttpResponse) -> Result<Vec<TemplateHeader>, ApiError> {
        let body: TemplateHeadersBody = parse_json(&response)?;
        Ok(body.template_headers)
    }

    // -----------------------------------------------------------------------
    // Request plumbing
    // -----------------------------------------------------------------------

    fn url(&self, route: &str) -> String {
        match &self.api_key {
            Some(key) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("api_key", key)
                    .finish();
                format!("{}{route}?{query}", self.base_url)
            }
            None => format!("{}{route}", self.base_url),
        }
    }

    fn request(&self, method: HttpMethod, route: &str) -> HttpRequest {
        HttpRequest {
            method,
            path: self.url(route),
            headers: vec![("accept".to_string(), "application/json".to_string())],
            body: None,
        }
    }

    fn form_request<T: Serialize>(&self, method: HttpMethod, route: &str, payload: &T) -> Result<HttpRequest, ApiError> {
        let payload = serde_json::to_value(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut request = self.request(method, route);
        request
            .headers
            .push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
        request.body = Some(encode_form(&payload)?);
        Ok(request)
    }
}

/// Path segment for `target`, rejecting empty external ids.
fn checked_segment(target: &TemplateRef) -> Result<String, ApiError> {
    if let TemplateRef::External(external_id) = target {
        if external_id.trim().is_empty() {
            return Err(ApiError::invalid("external template id must not be empty"));
        }
    }
    Ok(target.path_segment())
}

/// Map any non-2xx status to `ApiError::Http`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

fn parse_json<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response)?;
    serde_json::from_value(response.json()?).map_err(|e| ApiError::Deserialization(e.to_string()))
}
