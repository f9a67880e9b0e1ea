//! Canonical attribute model.
//!
//! A [`CrmAttribute`] is a named, typed value belonging to one entity.
//! Whatever native shape the backend sent, callers read and write it
//! through one textual surface: [`CrmAttribute::canonical_string`] and
//! [`CrmAttribute::set_from_string`]. The write side is deliberately
//! permissive — a string that does not parse for the attribute's kind is
//! silently ignored and the previous value is retained, which the
//! identity layer relies on for partial and speculative writes.

pub mod kind;
pub mod value;

pub use kind::AttributeKind;
pub use value::{AttributeValue, Reference};

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Out-of-band auxiliary data for [`CrmAttribute::set_from_string`].
///
/// Reference kinds cannot reconstruct a native value from an id string
/// alone; the referenced-type token travels here.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetAux<'a> {
    pub target: Option<&'a str>,
}

impl<'a> SetAux<'a> {
    pub fn target(target: &'a str) -> Self {
        Self {
            target: Some(target),
        }
    }
}

/// A named, typed attribute of one entity record.
///
/// The kind is fixed at construction; the name is mutable (write-back
/// uses it as the native field identity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrmAttribute {
    pub name: String,
    kind: AttributeKind,
    value: AttributeValue,
}

impl CrmAttribute {
    /// An empty attribute of the given kind.
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            value: AttributeValue::empty_of(kind),
        }
    }

    /// An attribute with an already-decoded canonical value. Used by the
    /// per-version adapters; `kind` records the precise reference-family
    /// member where the value shape alone is ambiguous.
    pub fn with_value(
        name: impl Into<String>,
        kind: AttributeKind,
        value: AttributeValue,
    ) -> Self {
        debug_assert!(
            kind.is_reference() && value.kind_hint() == AttributeKind::Lookup
                || value.kind_hint() == kind
        );
        Self {
            name: name.into(),
            kind,
            value,
        }
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    /// The selected option code, for option-set attributes. `None` for
    /// every other kind and for the explicit null option.
    pub fn option_code(&self) -> Option<i32> {
        if let AttributeValue::OptionSet { selected, .. } = &self.value {
            *selected
        } else {
            None
        }
    }

    /// The canonical string form of the current value. Total: absent and
    /// unrepresentable values read as the empty string.
    pub fn canonical_string(&self) -> String {
        self.value.canonical_string()
    }

    /// Apply a canonical string. Best effort: input that fails to parse
    /// for this attribute's kind is a silent no-op and the previous
    /// value is retained.
    pub fn set_from_string(&mut self, raw: &str, aux: SetAux<'_>) {
        if !self.value.apply_string(raw, aux.target) {
            trace!(
                attribute = %self.name,
                kind = %self.kind,
                input = raw,
                "ignoring unparsable attribute value"
            );
        }
    }
}
