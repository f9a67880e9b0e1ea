// ── V2011 adapter ──
//
// Loosely-typed attribute schema. Values are plain JSON scalars or small
// objects tagged with .NET class names; display labels (option labels,
// lookup names, boolean labels) live in the record's formatted-values
// side table and are folded back into the canonical value on decode.

use std::collections::BTreeMap;

use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crmid_api::v2011::{AttributeV2011, RecordV2011};

use crate::attribute::value::parse_datetime;
use crate::attribute::{AttributeKind, AttributeValue, CrmAttribute, Reference};
use crate::collection::AttributeCollection;
use crate::entity::CrmEntity;

/// Map a V2011 boxed-value class onto a canonical kind. Total. The
/// organization service boxes owner and customer references as plain
/// `EntityReference`, so those arrive as `Lookup`; metadata keeps the
/// precise family member.
pub fn kind_for_class(type_name: &str) -> AttributeKind {
    match type_name {
        "System.Guid" => AttributeKind::Key,
        "System.Boolean" => AttributeKind::Boolean,
        "System.Int32" => AttributeKind::Integer,
        "System.Int64" => AttributeKind::BigInt,
        "System.Decimal" => AttributeKind::Decimal,
        "System.Double" => AttributeKind::Float,
        "Microsoft.Xrm.Sdk.Money" => AttributeKind::Money,
        "System.DateTime" => AttributeKind::DateTime,
        "System.String" => AttributeKind::Text,
        "Microsoft.Xrm.Sdk.OptionSetValue" => AttributeKind::OptionSet,
        "Microsoft.Xrm.Sdk.EntityReference" => AttributeKind::Lookup,
        "Microsoft.Xrm.Sdk.EntityCollection" => AttributeKind::PartyList,
        _ => AttributeKind::Unsupported,
    }
}

/// Decode one attribute, consulting the record's formatted-values table
/// for the display label belonging to `attr.key`.
pub fn decode_attribute(attr: &AttributeV2011, formatted: Option<&str>) -> CrmAttribute {
    let kind = kind_for_class(&attr.type_name);
    let value = match kind {
        AttributeKind::Key => AttributeValue::Key(
            attr.value
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok()),
        ),
        AttributeKind::Boolean => {
            let value = attr.value.as_bool();
            // The side table only labels the current value.
            let (true_label, false_label) = match value {
                Some(true) => (formatted.map(String::from), None),
                Some(false) => (None, formatted.map(String::from)),
                None => (None, None),
            };
            AttributeValue::Boolean {
                value,
                true_label,
                false_label,
            }
        }
        AttributeKind::Integer => AttributeValue::Integer(
            attr.value.as_i64().and_then(|n| i32::try_from(n).ok()),
        ),
        AttributeKind::BigInt => AttributeValue::BigInt(attr.value.as_i64()),
        AttributeKind::Decimal => AttributeValue::Decimal(number_text(&attr.value)),
        AttributeKind::Float => AttributeValue::Float(attr.value.as_f64()),
        AttributeKind::Money => AttributeValue::Money(number_text(attr.value.get("Value").unwrap_or(&Value::Null))),
        AttributeKind::DateTime => {
            AttributeValue::DateTime(attr.value.as_str().and_then(parse_datetime))
        }
        AttributeKind::Text => AttributeValue::Text(attr.value.as_str().map(String::from)),
        AttributeKind::OptionSet => {
            let selected = attr
                .value
                .get("Value")
                .and_then(Value::as_i64)
                .and_then(|n| i32::try_from(n).ok());
            let mut labels = BTreeMap::new();
            if let (Some(code), Some(label)) = (selected, formatted) {
                labels.insert(code, label.to_owned());
            }
            AttributeValue::OptionSet { selected, labels }
        }
        AttributeKind::Lookup => {
            let mut reference = reference_from(&attr.value);
            if reference.name.is_none() {
                reference.name = formatted.map(String::from);
            }
            AttributeValue::Reference(reference)
        }
        AttributeKind::PartyList => AttributeValue::PartyList(
            attr.value
                .get("parties")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(reference_from).collect())
                .unwrap_or_default(),
        ),
        _ => {
            debug!(field = %attr.key, native_type = %attr.type_name,
                   "unrecognized native class, passing through");
            AttributeValue::Unsupported(json!({
                "type": attr.type_name,
                "value": attr.value,
            }))
        }
    };
    CrmAttribute::with_value(&attr.key, kind, value)
}

/// Adapt a full V2011 record into an entity. The envelope id wins over
/// any primary-key attribute.
pub fn entity_from_record(record: &RecordV2011) -> CrmEntity {
    let mut attributes = AttributeCollection::new();
    for attr in &record.attributes {
        attributes.insert(decode_attribute(attr, record.formatted(&attr.key)));
    }
    let id = record.id.or_else(|| super::id_from_attributes(&attributes));
    CrmEntity::from_parts(id, &record.logical_name, attributes)
}

/// Encode an entity back into the V2011 record shape, rebuilding the
/// formatted-values side table from whatever labels the canonical
/// values still carry.
pub fn record_from_entity(entity: &CrmEntity) -> RecordV2011 {
    let mut attributes = Vec::with_capacity(entity.attributes.len());
    let mut formatted_values = BTreeMap::new();

    for (name, attr) in &entity.attributes {
        let (encoded, label) = encode_attribute(name, attr);
        if let Some(label) = label {
            formatted_values.insert(name.to_owned(), label);
        }
        attributes.push(encoded);
    }

    RecordV2011 {
        logical_name: entity.logical_name.clone(),
        id: entity.id,
        attributes,
        formatted_values,
    }
}

fn encode_attribute(name: &str, attr: &CrmAttribute) -> (AttributeV2011, Option<String>) {
    let (type_name, payload, label): (&str, Value, Option<String>) = match attr.value() {
        AttributeValue::Key(v) => (
            "System.Guid",
            v.map_or(Value::Null, |id| json!(id.to_string())),
            None,
        ),
        AttributeValue::Boolean {
            value,
            true_label,
            false_label,
        } => {
            let label = match value {
                Some(true) => true_label.clone(),
                Some(false) => false_label.clone(),
                None => None,
            };
            ("System.Boolean", value.map_or(Value::Null, Value::from), label)
        }
        AttributeValue::Integer(v) => ("System.Int32", v.map_or(Value::Null, Value::from), None),
        AttributeValue::BigInt(v) => ("System.Int64", v.map_or(Value::Null, Value::from), None),
        AttributeValue::Decimal(v) => (
            "System.Decimal",
            v.as_deref().and_then(text_number).unwrap_or(Value::Null),
            None,
        ),
        AttributeValue::Float(v) => ("System.Double", v.map_or(Value::Null, Value::from), None),
        AttributeValue::Money(v) => (
            "Microsoft.Xrm.Sdk.Money",
            v.as_deref()
                .and_then(text_number)
                .map_or(Value::Null, |n| json!({ "Value": n })),
            None,
        ),
        AttributeValue::DateTime(v) => (
            "System.DateTime",
            v.map_or(Value::Null, |dt| {
                json!(dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            }),
            None,
        ),
        // V2011 boxes single- and multi-line text identically.
        AttributeValue::Text(v) | AttributeValue::Memo(v) | AttributeValue::EntityName(v) => (
            "System.String",
            v.clone().map_or(Value::Null, Value::from),
            None,
        ),
        AttributeValue::OptionSet { selected, labels } => (
            "Microsoft.Xrm.Sdk.OptionSetValue",
            selected.map_or(Value::Null, |code| json!({ "Value": code })),
            selected.and_then(|code| labels.get(&code).cloned()),
        ),
        AttributeValue::Reference(r) => (
            "Microsoft.Xrm.Sdk.EntityReference",
            reference_to(r),
            r.name.clone(),
        ),
        AttributeValue::PartyList(parties) => (
            "Microsoft.Xrm.Sdk.EntityCollection",
            json!({ "parties": parties.iter().map(reference_to).collect::<Vec<_>>() }),
            None,
        ),
        AttributeValue::Unsupported(raw) => {
            let tag = raw
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_owned();
            let payload = raw.get("value").cloned().unwrap_or(Value::Null);
            return (AttributeV2011::new(name, tag, payload), None);
        }
    };
    (AttributeV2011::new(name, type_name, payload), label)
}

// ── Payload helpers ─────────────────────────────────────────────────

fn number_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => crate::attribute::value::normalize_decimal(s),
        _ => None,
    }
}

fn text_number(text: &str) -> Option<Value> {
    serde_json::from_str::<serde_json::Number>(text)
        .ok()
        .map(Value::Number)
}

fn reference_from(value: &Value) -> Reference {
    Reference {
        id: value
            .get("Id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok()),
        target: value
            .get("LogicalName")
            .and_then(Value::as_str)
            .map(String::from),
        name: value.get("Name").and_then(Value::as_str).map(String::from),
    }
}

fn reference_to(r: &Reference) -> Value {
    let mut obj = serde_json::Map::new();
    if let Some(id) = r.id {
        obj.insert("Id".into(), json!(id.to_string()));
    }
    if let Some(ref target) = r.target {
        obj.insert("LogicalName".into(), json!(target));
    }
    if let Some(ref name) = r.name {
        obj.insert("Name".into(), json!(name));
    }
    Value::Object(obj)
}
