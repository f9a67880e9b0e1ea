// V2011 wire models — loosely-typed attribute schema
//
// The newest generation drops typed wrappers entirely: attribute values
// are plain JSON scalars or small tagged objects (.NET class names), and
// every display label lives in a separate `formatted_values` side table
// keyed by attribute name. Absent attributes are simply not transmitted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ── Record ───────────────────────────────────────────────────────────

/// A V2011 record.
///
/// ```json
/// {
///   "logical_name": "systemuser",
///   "id": "8f8e3bd5-0f4b-4a2b-9c61-1a2b3c4d5e6f",
///   "attributes": [
///     { "key": "isdisabled", "type": "System.Boolean", "value": false },
///     { "key": "preferredcontactmethodcode",
///       "type": "Microsoft.Xrm.Sdk.OptionSetValue", "value": { "Value": 2 } }
///   ],
///   "formatted_values": { "preferredcontactmethodcode": "Email" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordV2011 {
    pub logical_name: String,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub attributes: Vec<AttributeV2011>,
    /// Display labels keyed by attribute name (option labels, lookup
    /// names, formatted money). Not every attribute has an entry.
    #[serde(default)]
    pub formatted_values: BTreeMap<String, String>,
}

impl RecordV2011 {
    /// The formatted label for `key`, if the backend sent one.
    pub fn formatted(&self, key: &str) -> Option<&str> {
        self.formatted_values.get(key).map(String::as_str)
    }
}

/// One attribute of a V2011 record. `type_name` is the .NET class name
/// of the boxed value as reported by the organization service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeV2011 {
    pub key: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub value: Value,
}

impl AttributeV2011 {
    pub fn new(key: impl Into<String>, type_name: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            type_name: type_name.into(),
            value,
        }
    }
}

// ── Metadata ─────────────────────────────────────────────────────────

/// V2011 entity-type description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMetadataV2011 {
    pub logical_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub primary_id_attribute: Option<String>,
    #[serde(default)]
    pub primary_name_attribute: Option<String>,
    #[serde(default)]
    pub is_customizable: bool,
    #[serde(default)]
    pub is_custom_entity: bool,
    #[serde(default)]
    pub attributes: Vec<AttributeMetadataV2011>,
}

/// V2011 attribute description. `required_level` uses the service's
/// string form (`"None"`, `"Recommended"`, `"ApplicationRequired"`,
/// `"SystemRequired"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct AttributeMetadataV2011 {
    pub logical_name: String,
    pub attribute_type: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub required_level: Option<String>,
    #[serde(default)]
    pub is_valid_for_create: bool,
    #[serde(default)]
    pub is_valid_for_read: bool,
    #[serde(default)]
    pub is_valid_for_update: bool,
    #[serde(default)]
    pub is_valid_for_advanced_find: bool,
    #[serde(default)]
    pub options: Vec<OptionV2011>,
}

/// One option-set entry in V2011 metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionV2011 {
    pub value: i32,
    #[serde(default)]
    pub label: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_splits_values_and_labels() {
        let raw = r#"{
            "logical_name": "systemuser",
            "id": "8f8e3bd5-0f4b-4a2b-9c61-1a2b3c4d5e6f",
            "attributes": [
                { "key": "isdisabled", "type": "System.Boolean", "value": false },
                { "key": "preferredcontactmethodcode",
                  "type": "Microsoft.Xrm.Sdk.OptionSetValue", "value": { "Value": 2 } }
            ],
            "formatted_values": { "preferredcontactmethodcode": "Email" }
        }"#;
        let rec: RecordV2011 = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.attributes.len(), 2);
        assert_eq!(rec.formatted("preferredcontactmethodcode"), Some("Email"));
        assert_eq!(rec.formatted("isdisabled"), None);
    }

    #[test]
    fn missing_id_is_none() {
        let raw = r#"{ "logical_name": "role" }"#;
        let rec: RecordV2011 = serde_json::from_str(raw).unwrap();
        assert!(rec.id.is_none());
        assert!(rec.attributes.is_empty());
    }

    #[test]
    fn metadata_required_level_is_textual() {
        let raw = r#"{
            "logical_name": "role",
            "attributes": [
                { "logical_name": "name", "attribute_type": "String",
                  "required_level": "SystemRequired" }
            ]
        }"#;
        let md: EntityMetadataV2011 = serde_json::from_str(raw).unwrap();
        assert_eq!(
            md.attributes[0].required_level.as_deref(),
            Some("SystemRequired")
        );
    }
}
