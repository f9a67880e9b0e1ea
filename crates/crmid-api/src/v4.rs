// V4 wire models — property-bag schema
//
// The middle generation keys properties by attribute name and marks
// absence with an explicit `IsNull` flag instead of an empty wrapper.
// Type names grew a `Property` suffix; money values became strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Record ───────────────────────────────────────────────────────────

/// A V4 record: logical name plus a name-keyed property bag.
///
/// ```json
/// {
///   "name": "systemuser",
///   "properties": {
///     "isdisabled": { "type": "CrmBooleanProperty",
///                     "value": { "Value": false }, "is_null": false }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordV4 {
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyV4>,
}

/// One property of a V4 record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyV4 {
    #[serde(rename = "type")]
    pub type_name: String,
    /// Explicit absence marker; the payload is ignored when set.
    #[serde(default)]
    pub is_null: bool,
    #[serde(default)]
    pub value: Value,
}

impl PropertyV4 {
    pub fn new(type_name: impl Into<String>, value: Value) -> Self {
        Self {
            type_name: type_name.into(),
            is_null: value.is_null(),
            value,
        }
    }

    /// A null property of the given wrapper class.
    pub fn null(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            is_null: true,
            value: Value::Null,
        }
    }
}

// ── Metadata ─────────────────────────────────────────────────────────

/// V4 entity-type description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMetadataV4 {
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
    pub is_custom_entity: bool,
    #[serde(default)]
    pub attributes: Vec<AttributeMetadataV4>,
}

/// V4 attribute description. `required_level` is numeric:
/// 0=none, 1=system required, 2=application required, 3=recommended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct AttributeMetadataV4 {
    pub logical_name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub required_level: i32,
    #[serde(default)]
    pub valid_for_create: bool,
    #[serde(default)]
    pub valid_for_read: bool,
    #[serde(default)]
    pub valid_for_update: bool,
    #[serde(default)]
    pub valid_for_find: bool,
    #[serde(default)]
    pub options: Vec<OptionV4>,
}

/// One picklist option in V4 metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionV4 {
    pub value: i32,
    #[serde(default)]
    pub label: Option<String>,
}
