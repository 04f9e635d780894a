//! C-ABI wrapper around `wallet-core`.
//!
//! # Overview
//! Exposes the pass and template operations through `extern "C"` functions
//! so any language with a C FFI can build requests and parse responses
//! while doing the HTTP I/O itself.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Per-operation `build_*` / `parse_*` mirrors the core API 1:1.
//! - Free-form JSON (pass fields, template definitions) is passed in and
//!   out as JSON C strings.
//! - A template is addressed by `(template_id, external_id)`: a non-null
//!   `external_id` wins, otherwise `template_id` is used.
//! - A single `FfiWalletResult` envelope with `FfiDataTag` + `void* data`
//!   conveys success payloads and errors uniformly.
//! - The C caller owns all returned pointers and must call the matching
//!   `wallet_free_*` function to release them.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use wallet_core::http::HttpResponse;
use wallet_core::{FieldMap, NewTemplate, Pass, TemplateRef, WalletClient};

use types::*;

/// Borrow a C string as `&str`. Null and invalid UTF-8 yield `None`.
///
/// # Safety
/// `s` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn read_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

/// Decode a JSON C string into `T`. Null, invalid UTF-8 and malformed JSON
/// yield `None`.
unsafe fn read_json<T: serde::de::DeserializeOwned>(s: *const c_char) -> Option<T> {
    serde_json::from_str(unsafe { read_str(s) }?).ok()
}

unsafe fn template_ref(template_id: u64, external_id: *const c_char) -> Option<TemplateRef> {
    if external_id.is_null() {
        return Some(TemplateRef::Id(template_id));
    }
    unsafe { read_str(external_id) }.map(TemplateRef::from)
}

/// Run `f` against a non-null client, mapping null and panics to null.
fn build_with<F>(client: *const FfiWalletClient, f: F) -> *mut FfiHttpRequest
where
    F: FnOnce(&WalletClient) -> Option<wallet_core::HttpRequest>,
{
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        match f(&client.inner) {
            Some(req) => FfiHttpRequest::from_core(req),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Convert an `FfiHttpResponse` to a core `HttpResponse`. A null body is
/// read as empty.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    HttpResponse {
        status: resp.status,
        headers: Vec::new(),
        body: unsafe { read_str(resp.body) }.unwrap_or_default().to_string(),
    }
}

/// Null-check `client` and `response`, then hand both to `f`.
fn parse_with<F>(
    name: &str,
    client: *const FfiWalletClient,
    response: *const FfiHttpResponse,
    f: F,
) -> *mut FfiWalletResult
where
    F: FnOnce(&WalletClient, HttpResponse) -> *mut FfiWalletResult,
{
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiWalletResult::null_arg("client");
        }
        if response.is_null() {
            return FfiWalletResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = ffi_response_to_core(unsafe { &*response });
        f(&client.inner, resp)
    }))
    .unwrap_or_else(|_| FfiWalletResult::panic(&format!("panic in {name}")))
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new `WalletClient` bound to `base_url`. `api_key` may be null.
///
/// Returns null if `base_url` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `wallet_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_client_new(base_url: *const c_char, api_key: *const c_char) -> *mut FfiWalletClient {
    catch_unwind(|| {
        let Some(url) = (unsafe { read_str(base_url) }) else {
            return std::ptr::null_mut();
        };
        let mut client = WalletClient::new(url);
        if let Some(key) = unsafe { read_str(api_key) } {
            client = client.with_api_key(key);
        }
        Box::into_raw(Box::new(FfiWalletClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `wallet_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_client_free(client: *mut FfiWalletClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Build request functions: passes
// ---------------------------------------------------------------------------

/// Build a request creating a pass from template `template_id`.
///
/// `fields_json` must be a JSON object. Returns null on a null argument or
/// malformed JSON. The caller must free the result with `wallet_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_build_create_pass(
    client: *const FfiWalletClient,
    template_id: u64,
    fields_json: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        let fields: FieldMap = unsafe { read_json(fields_json) }?;
        c.build_create_pass(template_id, &fields).ok()
    })
}

/// Build a request fetching pass `pass_id`.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_build_get_pass(client: *const FfiWalletClient, pass_id: u64) -> *mut FfiHttpRequest {
    build_with(client, |c| Some(c.build_get_pass(pass_id)))
}

/// Build a request replacing the field values of pass `pass_id`.
///
/// Returns null on a null argument or malformed JSON.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_build_update_pass(
    client: *const FfiWalletClient,
    pass_id: u64,
    fields_json: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        let pass = Pass {
            pass_id: Some(pass_id),
            fields: unsafe { read_json(fields_json) }?,
            ..Pass::default()
        };
        c.build_update_pass(&pass).ok()
    })
}

/// Build a request downloading the pass file of `pass_id`. The response
/// body is the raw file; there is no matching parse function.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_build_download_pass(client: *const FfiWalletClient, pass_id: u64) -> *mut FfiHttpRequest {
    build_with(client, |c| Some(c.build_download_pass(pass_id)))
}

// ---------------------------------------------------------------------------
// Build request functions: templates
// ---------------------------------------------------------------------------

/// Build a request creating a template from `template_json`
/// (`{"fields", "headers", "name", "description", "type"}`).
///
/// When `external_id` is non-null the template is registered under it.
/// Returns null on a null argument, malformed JSON or an empty external id.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_build_create_template(
    client: *const FfiWalletClient,
    external_id: *const c_char,
    template_json: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        let template: NewTemplate = unsafe { read_json(template_json) }?;
        if external_id.is_null() {
            return c.build_create_template(&template).ok();
        }
        let external_id = unsafe { read_str(external_id) }?;
        c.build_create_template_with_external_id(external_id, &template).ok()
    })
}

/// Build a request fetching a template.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_build_get_template(
    client: *const FfiWalletClient,
    template_id: u64,
    external_id: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        let target = unsafe { template_ref(template_id, external_id) }?;
        c.build_get_template(&target).ok()
    })
}

/// Build a request replacing a template with `template_json`.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_build_update_template(
    client: *const FfiWalletClient,
    template_id: u64,
    external_id: *const c_char,
    template_json: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        let target = unsafe { template_ref(template_id, external_id) }?;
        let template: NewTemplate = unsafe { read_json(template_json) }?;
        c.build_update_template(&target, &template).ok()
    })
}

/// Build a request duplicating a template. Parse the response with
/// `wallet_parse_create_template`.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_build_duplicate_template(
    client: *const FfiWalletClient,
    template_id: u64,
    external_id: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        let target = unsafe { template_ref(template_id, external_id) }?;
        c.build_duplicate_template(&target).ok()
    })
}

/// Build a request deleting a template.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_build_delete_template(
    client: *const FfiWalletClient,
    template_id: u64,
    external_id: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        let target = unsafe { template_ref(template_id, external_id) }?;
        c.build_delete_template(&target).ok()
    })
}

/// Build a request listing every template header.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_build_list_template_headers(client: *const FfiWalletClient) -> *mut FfiHttpRequest {
    build_with(client, |c| Some(c.build_list_template_headers()))
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Parse a create-pass response. Returns `data_tag = Pass` on success.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_parse_create_pass(
    client: *const FfiWalletClient,
    template_id: u64,
    response: *const FfiHttpResponse,
) -> *mut FfiWalletResult {
    parse_with("wallet_parse_create_pass", client, response, |c, resp| {
        match c.parse_create_pass(template_id, resp) {
            Ok(pass) => FfiWalletResult::ok_pass(pass),
            Err(e) => FfiWalletResult::from_error(e),
        }
    })
}

/// Parse a get-pass response. Returns `data_tag = Pass` on success.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_parse_get_pass(
    client: *const FfiWalletClient,
    response: *const FfiHttpResponse,
) -> *mut FfiWalletResult {
    parse_with("wallet_parse_get_pass", client, response, |c, resp| match c.parse_get_pass(resp) {
        Ok(pass) => FfiWalletResult::ok_pass(pass),
        Err(e) => FfiWalletResult::from_error(e),
    })
}

/// Parse an update-pass response. Returns `data_tag = Url` on success;
/// `data` is the new pass URL, or null when the server sent none.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_parse_update_pass(
    client: *const FfiWalletClient,
    response: *const FfiHttpResponse,
) -> *mut FfiWalletResult {
    parse_with("wallet_parse_update_pass", client, response, |c, resp| {
        match c.parse_update_pass(&Pass::default(), resp) {
            Ok(pass) => FfiWalletResult::ok_url(pass.url),
            Err(e) => FfiWalletResult::from_error(e),
        }
    })
}

/// Parse a create-template or duplicate-template response.
/// Returns `data_tag = TemplateId` on success.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_parse_create_template(
    client: *const FfiWalletClient,
    response: *const FfiHttpResponse,
) -> *mut FfiWalletResult {
    parse_with("wallet_parse_create_template", client, response, |c, resp| {
        match c.parse_create_template(resp) {
            Ok(id) => FfiWalletResult::ok_template_id(id),
            Err(e) => FfiWalletResult::from_error(e),
        }
    })
}

/// Parse a get-template response. Returns `data_tag = Template` on success.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_parse_get_template(
    client: *const FfiWalletClient,
    response: *const FfiHttpResponse,
) -> *mut FfiWalletResult {
    parse_with("wallet_parse_get_template", client, response, |c, resp| {
        match c.parse_get_template(resp) {
            Ok(template) => FfiWalletResult::ok_template(template),
            Err(e) => FfiWalletResult::from_error(e),
        }
    })
}

/// Parse an update-template response. Returns `data_tag = None` on success.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_parse_update_template(
    client: *const FfiWalletClient,
    response: *const FfiHttpResponse,
) -> *mut FfiWalletResult {
    parse_with("wallet_parse_update_template", client, response, |c, resp| {
        match c.parse_update_template(resp) {
            Ok(()) => FfiWalletResult::ok_empty(),
            Err(e) => FfiWalletResult::from_error(e),
        }
    })
}

/// Parse a delete-template response. Returns `data_tag = None` on success.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_parse_delete_template(
    client: *const FfiWalletClient,
    response: *const FfiHttpResponse,
) -> *mut FfiWalletResult {
    parse_with("wallet_parse_delete_template", client, response, |c, resp| {
        match c.parse_delete_template(resp) {
            Ok(()) => FfiWalletResult::ok_empty(),
            Err(e) => FfiWalletResult::from_error(e),
        }
    })
}

/// Parse a list-template-headers response. Returns `data_tag = JsonList`
/// on success, one JSON object per header.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_parse_list_template_headers(
    client: *const FfiWalletClient,
    response: *const FfiHttpResponse,
) -> *mut FfiWalletResult {
    parse_with("wallet_parse_list_template_headers", client, response, |c, resp| {
        match c.parse_list_template_headers(resp) {
            Ok(headers) => FfiWalletResult::ok_headers(headers),
            Err(e) => FfiWalletResult::from_error(e),
        }
    })
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by any `wallet_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        unsafe {
            drop_c_string(req.path);
            drop_c_string(req.body);
            for h in from_raw_parts(req.headers, req.headers_len) {
                drop_c_string(h.key);
                drop_c_string(h.value);
            }
        }
    });
}

/// Free an `FfiWalletResult` returned by any `wallet_parse_*` function.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_free_result(result: *mut FfiWalletResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        unsafe { drop_c_string(result.error_message) };
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::Pass => {
                let pass = unsafe { Box::from_raw(result.data as *mut FfiPass) };
                unsafe {
                    drop_c_string(pass.url);
                    drop_c_string(pass.fields_json);
                }
            }
            FfiDataTag::Url => unsafe { drop_c_string(result.data as *mut c_char) },
            FfiDataTag::TemplateId => {
                drop(unsafe { Box::from_raw(result.data as *mut FfiTemplateId) });
            }
            FfiDataTag::Template => {
                let template = unsafe { Box::from_raw(result.data as *mut FfiTemplate) };
                unsafe {
                    drop_c_string(template.header_json);
                    drop_c_string(template.fields_model_json);
                }
            }
            FfiDataTag::JsonList => {
                let list = unsafe { Box::from_raw(result.data as *mut FfiJsonList) };
                for item in unsafe { from_raw_parts(list.items, list.len) } {
                    unsafe { drop_c_string(item) };
                }
            }
            FfiDataTag::None => {}
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn wallet_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| unsafe { drop_c_string(s) });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
