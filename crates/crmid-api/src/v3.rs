// V3 wire models — classic typed-wrapper schema
//
// The oldest backend generation returns a flat field list where every
// field value is a typed wrapper object. Absent values are transmitted as
// an empty wrapper (`{}`), not omitted. Field order is significant for
// write-back: the service rejects payloads whose field identity changed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Record ───────────────────────────────────────────────────────────

/// A V3 record: logical entity name plus an ordered field list.
///
/// ```json
/// {
///   "entity_name": "systemuser",
///   "fields": [
///     { "name": "systemuserid", "type": "Key", "value": { "Value": "8f8…" } },
///     { "name": "isdisabled", "type": "CrmBoolean", "value": { "Value": false } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordV3 {
    pub entity_name: String,
    #[serde(default)]
    pub fields: Vec<FieldV3>,
}

/// One typed field of a V3 record.
///
/// `type_name` selects the wrapper class; `value` holds whatever payload
/// that class uses. Unrecognized type names must survive a round trip
/// untouched, so the payload stays a raw [`Value`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldV3 {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub value: Value,
}

impl FieldV3 {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            value,
        }
    }
}

// ── Metadata ─────────────────────────────────────────────────────────

/// V3 entity-type description from the metadata service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMetadataV3 {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub primary_field: Option<String>,
    #[serde(default)]
    pub is_customizable: bool,
    #[serde(default)]
    pub attributes: Vec<AttributeMetadataV3>,
}

/// V3 attribute description. `required` is the raw service string
/// (`"none"`, `"recommended"`, `"required"`, `"systemrequired"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeMetadataV3 {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub required: Option<String>,
    #[serde(default)]
    pub valid_for_create: bool,
    #[serde(default)]
    pub valid_for_read: bool,
    #[serde(default)]
    pub valid_for_update: bool,
    /// Option list for picklist-backed attributes: `[[code, label], …]`.
    #[serde(default)]
    pub options: Vec<(i32, String)>,
}
