// ── V3 adapter ──
//
// Classic typed-wrapper schema. Scalar wrappers carry a `Value` payload,
// strings travel bare, references carry `Value`/`type`/`name`, and party
// lists are arrays of reference wrappers.

use std::collections::BTreeMap;

use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crmid_api::v3::{FieldV3, RecordV3};

use crate::attribute::value::{normalize_decimal, parse_datetime};
use crate::attribute::{AttributeKind, AttributeValue, CrmAttribute, Reference};
use crate::collection::AttributeCollection;
use crate::entity::{CrmEntity, STATE_ATTRIBUTE, STATUS_ATTRIBUTE};

/// Map a V3 wrapper class onto a canonical kind. Total: unknown classes
/// fall back to `Unsupported`.
pub fn kind_for_type(type_name: &str) -> AttributeKind {
    match type_name {
        "Key" => AttributeKind::Key,
        "CrmBoolean" => AttributeKind::Boolean,
        "CrmNumber" => AttributeKind::Integer,
        "CrmFloat" => AttributeKind::Float,
        "CrmDecimal" => AttributeKind::Decimal,
        "CrmMoney" => AttributeKind::Money,
        "CrmDateTime" => AttributeKind::DateTime,
        "String" => AttributeKind::Text,
        "Memo" => AttributeKind::Memo,
        "Picklist" | "State" | "Status" => AttributeKind::OptionSet,
        "Lookup" => AttributeKind::Lookup,
        "Owner" => AttributeKind::Owner,
        "Customer" => AttributeKind::Customer,
        "EntityNameReference" => AttributeKind::EntityName,
        "DynamicEntityArray" => AttributeKind::PartyList,
        _ => AttributeKind::Unsupported,
    }
}

/// Decode one native field into a canonical attribute.
pub fn decode_field(field: &FieldV3) -> CrmAttribute {
    let kind = kind_for_type(&field.type_name);
    let value = match kind {
        AttributeKind::Key => AttributeValue::Key(wrapped_uuid(&field.value)),
        AttributeKind::Boolean => AttributeValue::Boolean {
            value: field.value.get("Value").and_then(Value::as_bool),
            true_label: None,
            false_label: None,
        },
        AttributeKind::Integer => AttributeValue::Integer(
            field
                .value
                .get("Value")
                .and_then(Value::as_i64)
                .and_then(|n| i32::try_from(n).ok()),
        ),
        AttributeKind::Float => {
            AttributeValue::Float(field.value.get("Value").and_then(Value::as_f64))
        }
        AttributeKind::Decimal => AttributeValue::Decimal(wrapped_decimal(&field.value)),
        AttributeKind::Money => AttributeValue::Money(wrapped_decimal(&field.value)),
        AttributeKind::DateTime => AttributeValue::DateTime(
            field
                .value
                .get("Value")
                .and_then(Value::as_str)
                .and_then(parse_datetime),
        ),
        AttributeKind::Text => AttributeValue::Text(bare_string(&field.value)),
        AttributeKind::Memo => AttributeValue::Memo(bare_string(&field.value)),
        AttributeKind::OptionSet => {
            let selected = field
                .value
                .get("Value")
                .and_then(Value::as_i64)
                .and_then(|n| i32::try_from(n).ok());
            let mut labels = BTreeMap::new();
            if let (Some(code), Some(name)) =
                (selected, field.value.get("name").and_then(Value::as_str))
            {
                labels.insert(code, name.to_owned());
            }
            AttributeValue::OptionSet { selected, labels }
        }
        AttributeKind::Lookup | AttributeKind::Owner | AttributeKind::Customer => {
            AttributeValue::Reference(reference_from(&field.value))
        }
        AttributeKind::EntityName => {
            AttributeValue::EntityName(field.value.get("name").and_then(Value::as_str).map(String::from))
        }
        AttributeKind::PartyList => AttributeValue::PartyList(
            field
                .value
                .as_array()
                .map(|items| items.iter().map(reference_from).collect())
                .unwrap_or_default(),
        ),
        AttributeKind::BigInt | AttributeKind::Unsupported => {
            if kind == AttributeKind::Unsupported {
                debug!(field = %field.name, native_type = %field.type_name,
                       "unrecognized native class, passing through");
            }
            // Carry the class tag so write-back can reproduce the field.
            AttributeValue::Unsupported(json!({
                "type": field.type_name,
                "value": field.value,
            }))
        }
    };
    CrmAttribute::with_value(&field.name, kind, value)
}

/// Adapt a full V3 record into an entity.
pub fn entity_from_record(record: &RecordV3) -> CrmEntity {
    let mut attributes = AttributeCollection::new();
    for field in &record.fields {
        attributes.insert(decode_field(field));
    }
    let id = super::id_from_attributes(&attributes);
    CrmEntity::from_parts(id, &record.entity_name, attributes)
}

/// Encode an entity back into the V3 record shape, preserving field
/// order and identity.
pub fn record_from_entity(entity: &CrmEntity) -> RecordV3 {
    let fields = entity
        .attributes
        .iter()
        .map(|(name, attr)| encode_field(name, attr))
        .collect();
    RecordV3 {
        entity_name: entity.logical_name.clone(),
        fields,
    }
}

fn encode_field(name: &str, attr: &CrmAttribute) -> FieldV3 {
    let (type_name, payload) = match attr.value() {
        AttributeValue::Key(v) => ("Key", wrap_opt(v.map(|id| json!(id.to_string())))),
        AttributeValue::Boolean { value, .. } => ("CrmBoolean", wrap_opt(value.map(Value::from))),
        AttributeValue::Integer(v) => ("CrmNumber", wrap_opt(v.map(Value::from))),
        AttributeValue::BigInt(v) => {
            // V3 has no 64-bit wrapper; the number rides a CrmNumber.
            ("CrmNumber", wrap_opt(v.map(Value::from)))
        }
        AttributeValue::Float(v) => ("CrmFloat", wrap_opt(v.map(Value::from))),
        AttributeValue::Decimal(v) => ("CrmDecimal", wrap_opt(v.clone().map(Value::from))),
        AttributeValue::Money(v) => ("CrmMoney", wrap_opt(v.clone().map(Value::from))),
        AttributeValue::DateTime(v) => (
            "CrmDateTime",
            wrap_opt(v.map(|dt| json!(dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)))),
        ),
        AttributeValue::Text(v) => ("String", v.clone().map(Value::from).unwrap_or(Value::Null)),
        AttributeValue::Memo(v) => ("Memo", v.clone().map(Value::from).unwrap_or(Value::Null)),
        AttributeValue::OptionSet { selected, labels } => {
            // statecode/statuscode keep their dedicated wrapper classes.
            let tag = match name {
                STATE_ATTRIBUTE => "State",
                STATUS_ATTRIBUTE => "Status",
                _ => "Picklist",
            };
            let payload = selected.map_or(Value::Null, |code| {
                let mut obj = json!({ "Value": code });
                if let Some(label) = labels.get(&code) {
                    obj["name"] = json!(label);
                }
                obj
            });
            (tag, payload)
        }
        AttributeValue::Reference(r) => {
            let tag = match attr.kind() {
                AttributeKind::Owner => "Owner",
                AttributeKind::Customer => "Customer",
                _ => "Lookup",
            };
            (tag, reference_to(r))
        }
        AttributeValue::EntityName(v) => (
            "EntityNameReference",
            v.clone().map_or(Value::Null, |n| json!({ "name": n })),
        ),
        AttributeValue::PartyList(parties) => (
            "DynamicEntityArray",
            Value::Array(parties.iter().map(reference_to).collect()),
        ),
        AttributeValue::Unsupported(raw) => {
            // Pass the original class tag and payload straight back.
            let tag = raw
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_owned();
            let payload = raw.get("value").cloned().unwrap_or(Value::Null);
            return FieldV3::new(name, tag, payload);
        }
    };
    FieldV3::new(name, type_name, payload)
}

// ── Payload helpers ─────────────────────────────────────────────────

fn wrap_opt(inner: Option<Value>) -> Value {
    inner.map_or(Value::Null, |v| json!({ "Value": v }))
}

fn wrapped_uuid(value: &Value) -> Option<Uuid> {
    value
        .get("Value")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

fn wrapped_decimal(value: &Value) -> Option<String> {
    match value.get("Value") {
        Some(Value::String(s)) => normalize_decimal(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn bare_string(value: &Value) -> Option<String> {
    value.as_str().map(String::from)
}

fn reference_from(value: &Value) -> Reference {
    Reference {
        id: wrapped_uuid(value),
        target: value.get("type").and_then(Value::as_str).map(String::from),
        name: value.get("name").and_then(Value::as_str).map(String::from),
    }
}

fn reference_to(r: &Reference) -> Value {
    let mut obj = serde_json::Map::new();
    if let Some(id) = r.id {
        obj.insert("Value".into(), json!(id.to_string()));
    }
    if let Some(ref target) = r.target {
        obj.insert("type".into(), json!(target));
    }
    if let Some(ref name) = r.name {
        obj.insert("name".into(), json!(name));
    }
    Value::Object(obj)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_record() -> RecordV3 {
        serde_json::from_str(
            r#"{
            "entity_name": "systemuser",
            "fields": [
                { "name": "systemuserid", "type": "Key",
                  "value": { "Value": "8f8e3bd5-0f4b-4a2b-9c61-1a2b3c4d5e6f" } },
                { "name": "fullname", "type": "String", "value": "Jane Doe" },
                { "name": "isdisabled", "type": "CrmBoolean", "value": { "Value": false } },
                { "name": "createdon", "type": "CrmDateTime",
                  "value": { "Value": "2011-05-04T10:00:00" } },
                { "name": "creditlimit", "type": "CrmMoney", "value": { "Value": 1500.5 } },
                { "name": "statecode", "type": "State",
                  "value": { "Value": 0, "name": "Active" } },
                { "name": "parentsystemuserid", "type": "Lookup",
                  "value": { "Value": "0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9",
                             "type": "systemuser", "name": "John Boss" } },
                { "name": "frobnicator", "type": "FutureThing", "value": { "x": 1 } }
            ]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn decodes_record_to_canonical_strings() {
        let entity = entity_from_record(&sample_record());
        assert_eq!(
            entity.id.unwrap().to_string(),
            "8f8e3bd5-0f4b-4a2b-9c61-1a2b3c4d5e6f"
        );
        let get = |name: &str| entity.attributes.get(name).unwrap().canonical_string();
        assert_eq!(get("fullname"), "Jane Doe");
        assert_eq!(get("isdisabled"), "false");
        assert_eq!(get("createdon"), "2011-05-04T10:00:00Z");
        assert_eq!(get("creditlimit"), "1500.5");
        assert_eq!(get("statecode"), "Active");
        assert_eq!(get("parentsystemuserid"), "John Boss");
        // Unknown class decodes to empty, not an error.
        assert_eq!(get("frobnicator"), "");
        assert_eq!(
            entity.attributes.get("frobnicator").unwrap().kind(),
            AttributeKind::Unsupported
        );
    }

    #[test]
    fn encode_preserves_field_identity_and_order() {
        let entity = entity_from_record(&sample_record());
        let out = record_from_entity(&entity);

        let names: Vec<&str> = out.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "systemuserid",
                "fullname",
                "isdisabled",
                "createdon",
                "creditlimit",
                "statecode",
                "parentsystemuserid",
                "frobnicator"
            ]
        );
        // State keeps its dedicated wrapper class.
        assert_eq!(out.fields[5].type_name, "State");
        // Unsupported fields pass their original class and payload back.
        assert_eq!(out.fields[7].type_name, "FutureThing");
        assert_eq!(out.fields[7].value, serde_json::json!({ "x": 1 }));
    }

    #[test]
    fn money_decoded_from_wire_number_re_encodes_as_text() {
        let entity = entity_from_record(&sample_record());
        let out = record_from_entity(&entity);
        assert_eq!(out.fields[4].value, serde_json::json!({ "Value": "1500.5" }));
    }
}
