//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! tagged enums with explicit discriminants. Free-form JSON (pass fields,
//! template headers, fields model) crosses as serialized JSON strings.
//! Conversion functions live here to keep `lib.rs` focused on the
//! `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use serde_json::Value;
use wallet_core::error::ApiError;
use wallet_core::http::HttpMethod;
use wallet_core::{Pass, Template, TemplateHeader};

/// Opaque handle to a `WalletClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiWalletClient {
    pub(crate) inner: wallet_core::WalletClient,
}

/// Heap-allocate `s` as a C string. Interior NULs yield an empty string.
pub(crate) fn c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

fn c_json(value: &Value) -> *mut c_char {
    c_string(value.to_string())
}

/// Length of a list as exposed to C. Lists longer than `u32::MAX` cannot
/// be represented.
pub(crate) fn c_len(len: usize) -> Result<u32, ApiError> {
    u32::try_from(len).map_err(|_| ApiError::Deserialization(format!("list of {len} items exceeds the C length field")))
}

/// Move `items` onto the heap and return (pointer, len). Empty vectors
/// yield a null pointer.
fn into_raw_parts<T>(items: Vec<T>) -> Result<(*mut T, u32), ApiError> {
    let len = c_len(items.len())?;
    if items.is_empty() {
        return Ok((std::ptr::null_mut(), 0));
    }
    let mut boxed = items.into_boxed_slice();
    let ptr = boxed.as_mut_ptr();
    std::mem::forget(boxed);
    Ok((ptr, len))
}

/// Inverse of `into_raw_parts`.
///
/// # Safety
/// `ptr` and `len` must come from `into_raw_parts::<T>`.
pub(crate) unsafe fn from_raw_parts<T>(ptr: *mut T, len: u32) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    let slice = std::ptr::slice_from_raw_parts_mut(ptr, len as usize);
    unsafe { Box::from_raw(slice) }.into_vec()
}

/// Free a C string produced by `c_string`. Null is ignored.
///
/// # Safety
/// `s` must be null or come from `c_string`.
pub(crate) unsafe fn drop_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `wallet_build_*` functions. `body`, when non-null, is already
/// form-encoded and matches the `content-type` header. The C caller executes
/// the request and passes the response back through `wallet_parse_*`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub path: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    /// Returns null if the header list is too long for C.
    pub(crate) fn from_core(req: wallet_core::HttpRequest) -> *mut Self {
        if c_len(req.headers.len()).is_err() {
            return std::ptr::null_mut();
        }
        let body = match req.body {
            Some(b) => c_string(b),
            None => std::ptr::null_mut(),
        };
        let headers: Vec<FfiHeader> = req
            .headers
            .into_iter()
            .map(|(k, v)| FfiHeader {
                key: c_string(k),
                value: c_string(v),
            })
            .collect();
        let Ok((headers, headers_len)) = into_raw_parts(headers) else {
            return std::ptr::null_mut();
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            path: c_string(req.path),
            headers,
            headers_len,
            body,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing a request and
/// passes a pointer to a `wallet_parse_*` function. The FFI layer reads but
/// does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiWalletResult`.
///
/// `InvalidParameter` covers both null/missing arguments and the core's
/// invalid-parameter errors; every other non-zero code is an operation
/// failure.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    InvalidParameter = 1,
    Http = 2,
    Deserialization = 3,
    Serialization = 4,
    Transport = 5,
    Io = 6,
    Panic = 7,
}

/// Tag that tells `wallet_free_result` what `FfiWalletResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    Pass = 1,
    Url = 2,
    TemplateId = 3,
    Template = 4,
    JsonList = 5,
}

/// A pass exposed to C. `url` may be null; `fields_json` is a JSON object.
#[repr(C)]
pub struct FfiPass {
    pub pass_id: u64,
    pub has_template_id: bool,
    pub template_id: u64,
    pub url: *mut c_char,
    pub fields_json: *mut c_char,
}

/// Outcome of a template create or duplicate. `has_id` is false when the
/// server reported no usable id.
#[repr(C)]
pub struct FfiTemplateId {
    pub has_id: bool,
    pub id: u64,
}

/// A template exposed to C, with header and fields model as JSON objects.
#[repr(C)]
pub struct FfiTemplate {
    pub has_id: bool,
    pub id: u64,
    pub header_json: *mut c_char,
    pub fields_model_json: *mut c_char,
}

/// A list of JSON documents, one C string each.
#[repr(C)]
pub struct FfiJsonList {
    pub items: *mut *mut c_char,
    pub len: u32,
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the parsed payload (tagged by `data_tag`; `Url` data is a bare
/// C string and may be null). On failure `error_code` describes the
/// category, `error_message` is a human-readable C string, and `data` is
/// null.
#[repr(C)]
pub struct FfiWalletResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut std::ffi::c_void,
}

impl FfiWalletResult {
    fn ok(data_tag: FfiDataTag, data: *mut std::ffi::c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiWalletResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag,
            data,
        }))
    }

    fn error(error_code: FfiErrorCode, http_status: u16, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiWalletResult {
            error_code,
            error_message: c_string(msg),
            http_status,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn ok_pass(pass: Pass) -> *mut Self {
        let ffi_pass = Box::new(FfiPass {
            pass_id: pass.pass_id.unwrap_or_default(),
            has_template_id: pass.template_id.is_some(),
            template_id: pass.template_id.unwrap_or_default(),
            url: pass.url.map_or(std::ptr::null_mut(), c_string),
            fields_json: c_json(&Value::Object(pass.fields)),
        });
        Self::ok(FfiDataTag::Pass, Box::into_raw(ffi_pass) as *mut std::ffi::c_void)
    }

    pub(crate) fn ok_url(url: Option<String>) -> *mut Self {
        let data = url.map_or(std::ptr::null_mut(), c_string);
        Self::ok(FfiDataTag::Url, data as *mut std::ffi::c_void)
    }

    pub(crate) fn ok_template_id(id: Option<u64>) -> *mut Self {
        let ffi_id = Box::new(FfiTemplateId {
            has_id: id.is_some(),
            id: id.unwrap_or_default(),
        });
        Self::ok(FfiDataTag::TemplateId, Box::into_raw(ffi_id) as *mut std::ffi::c_void)
    }

    pub(crate) fn ok_template(template: Template) -> *mut Self {
        let id = template.id();
        let ffi_template = Box::new(FfiTemplate {
            has_id: id.is_some(),
            id: id.unwrap_or_default(),
            header_json: c_json(&Value::Object(template.header.0)),
            fields_model_json: c_json(&Value::Object(template.fields_model)),
        });
        Self::ok(FfiDataTag::Template, Box::into_raw(ffi_template) as *mut std::ffi::c_void)
    }

    pub(crate) fn ok_headers(headers: Vec<TemplateHeader>) -> *mut Self {
        if let Err(e) = c_len(headers.len()) {
            return Self::from_error(e);
        }
        let items: Vec<*mut c_char> = headers
            .into_iter()
            .map(|h| c_json(&Value::Object(h.0)))
            .collect();
        let (items, len) = match into_raw_parts(items) {
            Ok(parts) => parts,
            Err(e) => return Self::from_error(e),
        };
        let list = Box::new(FfiJsonList { items, len });
        Self::ok(FfiDataTag::JsonList, Box::into_raw(list) as *mut std::ffi::c_void)
    }

    /// Build a success result with no data payload (e.g. delete).
    pub(crate) fn ok_empty() -> *mut Self {
        Self::ok(FfiDataTag::None, std::ptr::null_mut())
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let (code, status) = match &err {
            ApiError::InvalidParameter(_) => (FfiErrorCode::InvalidParameter, 0),
            ApiError::Http { status, .. } => (FfiErrorCode::Http, *status),
            ApiError::Deserialization(_) => (FfiErrorCode::Deserialization, 0),
            ApiError::Serialization(_) => (FfiErrorCode::Serialization, 0),
            ApiError::Transport(_) => (FfiErrorCode::Transport, 0),
            ApiError::Io(_) => (FfiErrorCode::Io, 0),
        };
        Self::error(code, status, err.to_string())
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::error(FfiErrorCode::InvalidParameter, 0, format!("null argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::error(FfiErrorCode::Panic, 0, msg.to_string())
    }
}
