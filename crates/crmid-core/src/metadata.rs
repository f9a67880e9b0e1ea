//! Canonical entity-type metadata.
//!
//! Each backend generation describes entity types in its own vocabulary;
//! this module folds all three into one shape so callers never branch on
//! schema version. Adaptation is total and lossy-tolerant: unknown type
//! names become [`AttributeKind::Unsupported`], unknown required-level
//! spellings fall back to [`RequiredLevel::None`].

use serde::{Deserialize, Serialize};

use crmid_api::NativeMetadata;
use crmid_api::v2011::EntityMetadataV2011;
use crmid_api::v3::EntityMetadataV3;
use crmid_api::v4::EntityMetadataV4;

use crate::adapt;
use crate::attribute::AttributeKind;

/// How strongly the backend requires a value for an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequiredLevel {
    #[default]
    None,
    Recommended,
    ApplicationRequired,
    SystemRequired,
}

impl RequiredLevel {
    /// Whether a value must be present for the record to save.
    pub fn is_required(self) -> bool {
        matches!(self, Self::ApplicationRequired | Self::SystemRequired)
    }
}

/// One entry of an option set as described by metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionMetadata {
    pub code: i32,
    pub label: Option<String>,
}

/// Canonical description of one attribute of an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct AttributeMetadata {
    pub logical_name: String,
    pub kind: AttributeKind,
    pub display_name: Option<String>,
    pub required: RequiredLevel,
    pub valid_for_create: bool,
    pub valid_for_read: bool,
    pub valid_for_update: bool,
    pub valid_for_search: bool,
    pub options: Vec<OptionMetadata>,
}

impl AttributeMetadata {
    /// The display label, falling back to the logical name.
    pub fn display_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.logical_name)
    }

    /// The label of the option with `code`, if this attribute is
    /// option-set-backed and the code is defined.
    pub fn option_label(&self, code: i32) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.code == code)
            .and_then(|o| o.label.as_deref())
    }
}

/// Canonical description of one entity type.
///
/// The `Default` value is the "no metadata" sentinel (empty logical
/// name): lookups against it behave like an entity with no attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub logical_name: String,
    pub display_name: Option<String>,
    pub primary_key: Option<String>,
    pub primary_field: Option<String>,
    pub is_customizable: bool,
    pub is_custom: bool,
    pub attributes: Vec<AttributeMetadata>,
}

impl EntityMetadata {
    /// The display label, falling back to the logical name.
    pub fn display_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.logical_name)
    }

    /// The first attribute named `logical_name`, if any. Backends have
    /// been observed to repeat attribute entries; the first one wins.
    pub fn attribute(&self, logical_name: &str) -> Option<&AttributeMetadata> {
        self.attributes
            .iter()
            .find(|a| a.logical_name == logical_name)
    }
}

impl From<&NativeMetadata> for EntityMetadata {
    fn from(native: &NativeMetadata) -> Self {
        match native {
            NativeMetadata::V3(md) => md.into(),
            NativeMetadata::V4(md) => md.into(),
            NativeMetadata::V2011(md) => md.into(),
        }
    }
}

// ── V3 ───────────────────────────────────────────────────────────────

impl From<&EntityMetadataV3> for EntityMetadata {
    fn from(md: &EntityMetadataV3) -> Self {
        Self {
            logical_name: md.name.clone(),
            display_name: md.display_name.clone(),
            primary_key: md.primary_key.clone(),
            primary_field: md.primary_field.clone(),
            is_customizable: md.is_customizable,
            is_custom: false,
            attributes: md
                .attributes
                .iter()
                .map(|a| AttributeMetadata {
                    logical_name: a.name.clone(),
                    kind: adapt::v3::kind_for_type(&a.type_name),
                    display_name: a.display_name.clone(),
                    required: required_from_v3(a.required.as_deref()),
                    valid_for_create: a.valid_for_create,
                    valid_for_read: a.valid_for_read,
                    valid_for_update: a.valid_for_update,
                    // V3 has no searchability flag.
                    valid_for_search: false,
                    options: a
                        .options
                        .iter()
                        .map(|(code, label)| OptionMetadata {
                            code: *code,
                            label: Some(label.clone()),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

fn required_from_v3(raw: Option<&str>) -> RequiredLevel {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("recommended") => RequiredLevel::Recommended,
        Some("required") => RequiredLevel::ApplicationRequired,
        Some("systemrequired") => RequiredLevel::SystemRequired,
        _ => RequiredLevel::None,
    }
}

// ── V4 ───────────────────────────────────────────────────────────────

impl From<&EntityMetadataV4> for EntityMetadata {
    fn from(md: &EntityMetadataV4) -> Self {
        Self {
            logical_name: md.name.clone(),
            display_name: md.display_name.clone(),
            primary_key: md.primary_key.clone(),
            primary_field: md.primary_field.clone(),
            is_customizable: md.is_customizable,
            is_custom: md.is_custom_entity,
            attributes: md
                .attributes
                .iter()
                .map(|a| AttributeMetadata {
                    logical_name: a.logical_name.clone(),
                    kind: adapt::v4::kind_for_type(&a.type_name),
                    display_name: a.display_name.clone(),
                    required: required_from_v4(a.required_level),
                    valid_for_create: a.valid_for_create,
                    valid_for_read: a.valid_for_read,
                    valid_for_update: a.valid_for_update,
                    valid_for_search: a.valid_for_find,
                    options: a
                        .options
                        .iter()
                        .map(|o| OptionMetadata {
                            code: o.value,
                            label: o.label.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

fn required_from_v4(raw: i32) -> RequiredLevel {
    match raw {
        1 => RequiredLevel::SystemRequired,
        2 => RequiredLevel::ApplicationRequired,
        3 => RequiredLevel::Recommended,
        _ => RequiredLevel::None,
    }
}

// ── V2011 ────────────────────────────────────────────────────────────

impl From<&EntityMetadataV2011> for EntityMetadata {
    fn from(md: &EntityMetadataV2011) -> Self {
        Self {
            logical_name: md.logical_name.clone(),
            display_name: md.display_name.clone(),
            primary_key: md.primary_id_attribute.clone(),
            primary_field: md.primary_name_attribute.clone(),
            is_customizable: md.is_customizable,
            is_custom: md.is_custom_entity,
            attributes: md
                .attributes
                .iter()
                .map(|a| AttributeMetadata {
                    logical_name: a.logical_name.clone(),
                    kind: kind_for_v2011_type(&a.attribute_type),
                    display_name: a.display_name.clone(),
                    required: required_from_v2011(a.required_level.as_deref()),
                    valid_for_create: a.is_valid_for_create,
                    valid_for_read: a.is_valid_for_read,
                    valid_for_update: a.is_valid_for_update,
                    valid_for_search: a.is_valid_for_advanced_find,
                    options: a
                        .options
                        .iter()
                        .map(|o| OptionMetadata {
                            code: o.value,
                            label: o.label.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

// V2011 metadata names attribute type codes, not the boxed-value
// classes records use, so it gets its own mapping.
fn kind_for_v2011_type(attribute_type: &str) -> AttributeKind {
    match attribute_type {
        "Uniqueidentifier" => AttributeKind::Key,
        "Boolean" => AttributeKind::Boolean,
        "Integer" => AttributeKind::Integer,
        "BigInt" => AttributeKind::BigInt,
        "Decimal" => AttributeKind::Decimal,
        "Double" => AttributeKind::Float,
        "Money" => AttributeKind::Money,
        "DateTime" => AttributeKind::DateTime,
        "String" => AttributeKind::Text,
        "Memo" => AttributeKind::Memo,
        "Picklist" | "State" | "Status" => AttributeKind::OptionSet,
        "Lookup" => AttributeKind::Lookup,
        "Owner" => AttributeKind::Owner,
        "Customer" => AttributeKind::Customer,
        "PartyList" => AttributeKind::PartyList,
        "EntityName" => AttributeKind::EntityName,
        _ => AttributeKind::Unsupported,
    }
}

fn required_from_v2011(raw: Option<&str>) -> RequiredLevel {
    match raw {
        Some("Recommended") => RequiredLevel::Recommended,
        Some("ApplicationRequired") => RequiredLevel::ApplicationRequired,
        Some("SystemRequired") => RequiredLevel::SystemRequired,
        _ => RequiredLevel::None,
    }
}
