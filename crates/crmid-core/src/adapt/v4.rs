// ── V4 adapter ──
//
// Property-bag schema. Same wrapper payloads as V3 for the most part,
// but properties are keyed by name, absence is an explicit `is_null`
// marker, class tags carry a `Property` suffix, and money travels as a
// string instead of a number.

use std::collections::BTreeMap;

use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crmid_api::v4::{PropertyV4, RecordV4};

use crate::attribute::value::{normalize_decimal, parse_datetime};
use crate::attribute::{AttributeKind, AttributeValue, CrmAttribute, Reference};
use crate::collection::AttributeCollection;
use crate::entity::{CrmEntity, STATE_ATTRIBUTE, STATUS_ATTRIBUTE};

/// Map a V4 property class onto a canonical kind. Total.
pub fn kind_for_type(type_name: &str) -> AttributeKind {
    match type_name {
        "KeyProperty" => AttributeKind::Key,
        "CrmBooleanProperty" => AttributeKind::Boolean,
        "CrmNumberProperty" => AttributeKind::Integer,
        "CrmFloatProperty" => AttributeKind::Float,
        "CrmDecimalProperty" => AttributeKind::Decimal,
        "CrmMoneyProperty" => AttributeKind::Money,
        "CrmDateTimeProperty" => AttributeKind::DateTime,
        "StringProperty" => AttributeKind::Text,
        "MemoProperty" => AttributeKind::Memo,
        "PicklistProperty" | "StateProperty" | "StatusProperty" => AttributeKind::OptionSet,
        "LookupProperty" => AttributeKind::Lookup,
        "OwnerProperty" => AttributeKind::Owner,
        "CustomerProperty" => AttributeKind::Customer,
        "EntityNameReferenceProperty" => AttributeKind::EntityName,
        "DynamicEntityArrayProperty" => AttributeKind::PartyList,
        _ => AttributeKind::Unsupported,
    }
}

/// Decode one property into a canonical attribute.
pub fn decode_property(name: &str, prop: &PropertyV4) -> CrmAttribute {
    let kind = kind_for_type(&prop.type_name);
    if kind == AttributeKind::Unsupported {
        debug!(field = name, native_type = %prop.type_name,
               "unrecognized native class, passing through");
        let raw = json!({ "type": prop.type_name, "value": prop.value });
        return CrmAttribute::with_value(name, kind, AttributeValue::Unsupported(raw));
    }
    // The explicit null marker wins over whatever payload is present.
    if prop.is_null {
        return CrmAttribute::new(name, kind);
    }
    let value = match kind {
        AttributeKind::Key => AttributeValue::Key(wrapped_uuid(&prop.value)),
        AttributeKind::Boolean => AttributeValue::Boolean {
            value: prop.value.get("Value").and_then(Value::as_bool),
            true_label: None,
            false_label: None,
        },
        AttributeKind::Integer => AttributeValue::Integer(
            prop.value
                .get("Value")
                .and_then(Value::as_i64)
                .and_then(|n| i32::try_from(n).ok()),
        ),
        AttributeKind::Float => {
            AttributeValue::Float(prop.value.get("Value").and_then(Value::as_f64))
        }
        AttributeKind::Decimal => AttributeValue::Decimal(wrapped_text_decimal(&prop.value)),
        AttributeKind::Money => AttributeValue::Money(wrapped_text_decimal(&prop.value)),
        AttributeKind::DateTime => AttributeValue::DateTime(
            prop.value
                .get("Value")
                .and_then(Value::as_str)
                .and_then(parse_datetime),
        ),
        AttributeKind::Text => AttributeValue::Text(prop.value.as_str().map(String::from)),
        AttributeKind::Memo => AttributeValue::Memo(prop.value.as_str().map(String::from)),
        AttributeKind::OptionSet => {
            let selected = prop
                .value
                .get("Value")
                .and_then(Value::as_i64)
                .and_then(|n| i32::try_from(n).ok());
            let mut labels = BTreeMap::new();
            if let (Some(code), Some(label)) =
                (selected, prop.value.get("name").and_then(Value::as_str))
            {
                labels.insert(code, label.to_owned());
            }
            AttributeValue::OptionSet { selected, labels }
        }
        AttributeKind::Lookup | AttributeKind::Owner | AttributeKind::Customer => {
            AttributeValue::Reference(reference_from(&prop.value))
        }
        AttributeKind::EntityName => AttributeValue::EntityName(
            prop.value.get("name").and_then(Value::as_str).map(String::from),
        ),
        AttributeKind::PartyList => AttributeValue::PartyList(
            prop.value
                .as_array()
                .map(|items| items.iter().map(reference_from).collect())
                .unwrap_or_default(),
        ),
        // Handled above.
        AttributeKind::BigInt | AttributeKind::Unsupported => {
            AttributeValue::empty_of(kind)
        }
    };
    CrmAttribute::with_value(name, kind, value)
}

/// Adapt a full V4 record into an entity.
pub fn entity_from_record(record: &RecordV4) -> CrmEntity {
    let mut attributes = AttributeCollection::new();
    for (name, prop) in &record.properties {
        attributes.insert(decode_property(name, prop));
    }
    let id = super::id_from_attributes(&attributes);
    CrmEntity::from_parts(id, &record.name, attributes)
}

/// Encode an entity back into the V4 property bag.
pub fn record_from_entity(entity: &CrmEntity) -> RecordV4 {
    let properties = entity
        .attributes
        .iter()
        .map(|(name, attr)| (name.to_owned(), encode_property(name, attr)))
        .collect();
    RecordV4 {
        name: entity.logical_name.clone(),
        properties,
    }
}

fn encode_property(name: &str, attr: &CrmAttribute) -> PropertyV4 {
    let (type_name, payload) = match attr.value() {
        AttributeValue::Key(v) => (
            "KeyProperty".to_owned(),
            v.map(|id| json!({ "Value": id.to_string() })),
        ),
        AttributeValue::Boolean { value, .. } => (
            "CrmBooleanProperty".to_owned(),
            value.map(|b| json!({ "Value": b })),
        ),
        AttributeValue::Integer(v) => (
            "CrmNumberProperty".to_owned(),
            v.map(|n| json!({ "Value": n })),
        ),
        // V4 has no 64-bit wrapper either.
        AttributeValue::BigInt(v) => (
            "CrmNumberProperty".to_owned(),
            v.map(|n| json!({ "Value": n })),
        ),
        AttributeValue::Float(v) => (
            "CrmFloatProperty".to_owned(),
            v.map(|n| json!({ "Value": n })),
        ),
        AttributeValue::Decimal(v) => (
            "CrmDecimalProperty".to_owned(),
            v.clone().map(|t| json!({ "Value": t })),
        ),
        AttributeValue::Money(v) => (
            "CrmMoneyProperty".to_owned(),
            v.clone().map(|t| json!({ "Value": t })),
        ),
        AttributeValue::DateTime(v) => (
            "CrmDateTimeProperty".to_owned(),
            v.map(|dt| json!({ "Value": dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true) })),
        ),
        AttributeValue::Text(v) => ("StringProperty".to_owned(), v.clone().map(Value::from)),
        AttributeValue::Memo(v) => ("MemoProperty".to_owned(), v.clone().map(Value::from)),
        AttributeValue::OptionSet { selected, labels } => {
            let tag = match name {
                STATE_ATTRIBUTE => "StateProperty",
                STATUS_ATTRIBUTE => "StatusProperty",
                _ => "PicklistProperty",
            };
            let payload = selected.map(|code| {
                let mut obj = json!({ "Value": code });
                if let Some(label) = labels.get(&code) {
                    obj["name"] = json!(label);
                }
                obj
            });
            (tag.to_owned(), payload)
        }
        AttributeValue::Reference(r) => {
            let tag = match attr.kind() {
                AttributeKind::Owner => "OwnerProperty",
                AttributeKind::Customer => "CustomerProperty",
                _ => "LookupProperty",
            };
            let payload = (r != &Reference::default()).then(|| reference_to(r));
            (tag.to_owned(), payload)
        }
        AttributeValue::EntityName(v) => (
            "EntityNameReferenceProperty".to_owned(),
            v.clone().map(|n| json!({ "name": n })),
        ),
        AttributeValue::PartyList(parties) => (
            "DynamicEntityArrayProperty".to_owned(),
            (!parties.is_empty())
                .then(|| Value::Array(parties.iter().map(reference_to).collect())),
        ),
        AttributeValue::Unsupported(raw) => {
            let tag = raw
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_owned();
            let payload = raw.get("value").cloned().unwrap_or(Value::Null);
            return PropertyV4::new(tag, payload);
        }
    };
    match payload {
        Some(value) => PropertyV4::new(type_name, value),
        None => PropertyV4::null(type_name),
    }
}

// ── Payload helpers ─────────────────────────────────────────────────

fn wrapped_uuid(value: &Value) -> Option<Uuid> {
    value
        .get("Value")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

// V4 sends decimals and money as strings; tolerate numbers anyway.
fn wrapped_text_decimal(value: &Value) -> Option<String> {
    match value.get("Value") {
        Some(Value::String(s)) => normalize_decimal(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
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
