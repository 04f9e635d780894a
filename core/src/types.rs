//! Domain models and wire DTOs for the wallet API.
//!
//! # Design
//! Field values, header metadata and field descriptors are free-form on the
//! service side, so they stay as ordered JSON objects (`FieldMap`). Only the
//! identifiers get typed: the service sends them as numeric strings and the
//! client converts them to `u64`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Ordered JSON object, used for pass fields, header metadata and the
/// template fields model.
pub type FieldMap = Map<String, Value>;

/// A pass instantiated from a template.
///
/// `pass_id` is only ever filled in from a server response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pass {
    pub pass_id: Option<u64>,
    pub template_id: Option<u64>,
    pub url: Option<String>,
    pub fields: FieldMap,
}

impl Pass {
    /// Copy of this pass with `fields` replaced.
    pub fn with_fields(&self, fields: FieldMap) -> Self {
        Self {
            fields,
            ..self.clone()
        }
    }
}

/// Descriptive metadata of a template (id, name, description, type, ...).
///
/// The service has sent the id in two shapes over time: a bare numeric
/// string/number, and a `{"value": ...}` wrapper. `id()` accepts both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateHeader(pub FieldMap);

impl TemplateHeader {
    pub fn id(&self) -> Option<u64> {
        match self.0.get("id")? {
            Value::Object(wrapper) => wrapper.get("value").and_then(numeric_id),
            other => numeric_id(other),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.0.get("description").and_then(Value::as_str)
    }

    pub fn template_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// A reusable pass schema: header metadata plus field descriptors keyed by
/// field name (`value`, `label`, `changeMessage`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    pub header: TemplateHeader,
    pub fields_model: FieldMap,
}

impl Template {
    pub fn id(&self) -> Option<u64> {
        self.header.id()
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields_model.get(key)
    }
}

/// Addresses a template either by its server-assigned id or by the
/// caller-supplied external id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRef {
    Id(u64),
    External(String),
}

impl TemplateRef {
    /// Path segment(s) after `/template/`: `{id}` or `id/{externalId}`.
    /// The external id is percent-encoded as a single segment.
    pub(crate) fn path_segment(&self) -> String {
        match self {
            TemplateRef::Id(id) => id.to_string(),
            TemplateRef::External(external_id) => format!("id/{}", urlencoding::encode(external_id)),
        }
    }
}

impl From<u64> for TemplateRef {
    fn from(id: u64) -> Self {
        TemplateRef::Id(id)
    }
}

impl From<&str> for TemplateRef {
    fn from(external_id: &str) -> Self {
        TemplateRef::External(external_id.to_string())
    }
}

impl From<String> for TemplateRef {
    fn from(external_id: String) -> Self {
        TemplateRef::External(external_id)
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateRef::Id(id) => write!(f, "{id}"),
            TemplateRef::External(external_id) => write!(f, "external id {external_id:?}"),
        }
    }
}

/// Payload for creating or modifying a template.
///
/// Serializes to `{fields, headers, name, description, type}`; unset text
/// attributes go out as JSON `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub fields: FieldMap,
    pub headers: FieldMap,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub template_type: Option<String>,
}

impl NewTemplate {
    pub fn new(headers: FieldMap, fields: FieldMap) -> Self {
        Self {
            fields,
            headers,
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn template_type(mut self, template_type: impl Into<String>) -> Self {
        self.template_type = Some(template_type.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------------

/// Body of `POST /pass/{templateId}` and `GET /pass/{passId}` responses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PassBody {
    #[serde(deserialize_with = "required_id")]
    pub id: u64,
    #[serde(default, deserialize_with = "optional_id")]
    pub template_id: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub pass_fields: Option<FieldMap>,
}

/// Body of `PUT /pass/{passId}` responses.
#[derive(Debug, Deserialize)]
pub(crate) struct PassUrlBody {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TemplateBody {
    #[serde(default)]
    pub template_header: Option<TemplateHeader>,
    #[serde(default)]
    pub fields_model: Option<FieldMap>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TemplateHeadersBody {
    #[serde(default)]
    pub template_headers: Vec<TemplateHeader>,
}

/// Body of template create/duplicate responses. The id is kept raw so the
/// parser can apply its own fallback policy.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TemplateIdBody {
    #[serde(default)]
    pub template_id: Option<Value>,
}

/// Interpret a JSON value as a service identifier: a numeric string or a
/// non-negative integer.
pub(crate) fn numeric_id(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn required_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    numeric_id(&value).ok_or_else(|| serde::de::Error::custom(format!("expected a numeric id, got {value}")))
}

fn optional_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => numeric_id(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("expected a numeric id, got {value}"))),
    }
}
