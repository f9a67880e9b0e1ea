// ── Entity wrapper ──
//
// Couples an attribute collection to record identity and tracks the two
// state pseudo-fields for dirty-checking before a write-back.
//
// Dirty-checking compares the *selected option code* against a snapshot
// taken at construction — value equality, not object identity. The
// source system this replaces compared attribute references instead,
// which misreported re-fetched-but-equal values as changed and missed
// in-place mutations entirely. Integrators relying on the old behavior
// must re-check; the tests below pin the value-equality rule in both
// directions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attribute::CrmAttribute;
use crate::collection::AttributeCollection;

/// Attribute name of the state pseudo-field.
pub const STATE_ATTRIBUTE: &str = "statecode";
/// Attribute name of the status pseudo-field.
pub const STATUS_ATTRIBUTE: &str = "statuscode";

/// One entity record: identity plus its attribute collection.
///
/// Owned by the repository call that produced it; not safe for
/// concurrent writers. A new record pending its first save has no id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrmEntity {
    pub id: Option<Uuid>,
    pub logical_name: String,
    pub attributes: AttributeCollection,
    state_snapshot: Option<i32>,
    status_snapshot: Option<i32>,
}

impl CrmEntity {
    /// A new, empty record of the given logical type.
    pub fn new(logical_name: impl Into<String>) -> Self {
        Self {
            id: None,
            logical_name: logical_name.into(),
            attributes: AttributeCollection::new(),
            state_snapshot: None,
            status_snapshot: None,
        }
    }

    /// Wrap an adapted record, snapshotting the state/status option
    /// codes for later dirty-checking.
    pub fn from_parts(
        id: Option<Uuid>,
        logical_name: impl Into<String>,
        attributes: AttributeCollection,
    ) -> Self {
        let state_snapshot = option_code_of(&attributes, STATE_ATTRIBUTE);
        let status_snapshot = option_code_of(&attributes, STATUS_ATTRIBUTE);
        Self {
            id,
            logical_name: logical_name.into(),
            attributes,
            state_snapshot,
            status_snapshot,
        }
    }

    /// Canonical string of the state pseudo-field.
    pub fn state(&self) -> String {
        self.attributes
            .get(STATE_ATTRIBUTE)
            .map(CrmAttribute::canonical_string)
            .unwrap_or_default()
    }

    /// Canonical string of the status pseudo-field.
    pub fn status(&self) -> String {
        self.attributes
            .get(STATUS_ATTRIBUTE)
            .map(CrmAttribute::canonical_string)
            .unwrap_or_default()
    }

    /// Whether the state option differs from its construction snapshot.
    pub fn state_changed(&self) -> bool {
        option_code_of(&self.attributes, STATE_ATTRIBUTE) != self.state_snapshot
    }

    /// Whether the status option differs from its construction snapshot.
    pub fn status_changed(&self) -> bool {
        option_code_of(&self.attributes, STATUS_ATTRIBUTE) != self.status_snapshot
    }
}

fn option_code_of(attributes: &AttributeCollection, name: &str) -> Option<i32> {
    attributes.get(name).and_then(CrmAttribute::option_code)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::attribute::{AttributeKind, AttributeValue, SetAux};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn state_attr(code: i32) -> CrmAttribute {
        CrmAttribute::with_value(
            STATE_ATTRIBUTE,
            AttributeKind::OptionSet,
            AttributeValue::OptionSet {
                selected: Some(code),
                labels: BTreeMap::from([(0, "Active".to_owned()), (1, "Inactive".to_owned())]),
            },
        )
    }

    fn entity_with_state(code: i32) -> CrmEntity {
        let mut attrs = AttributeCollection::new();
        attrs.insert(state_attr(code));
        CrmEntity::from_parts(Some(Uuid::new_v4()), "systemuser", attrs)
    }

    #[test]
    fn fresh_entity_reports_unchanged() {
        let entity = entity_with_state(0);
        assert!(!entity.state_changed());
        assert!(!entity.status_changed());
        assert_eq!(entity.state(), "Active");
    }

    #[test]
    fn different_code_reads_changed_immediately() {
        let mut entity = entity_with_state(0);
        entity
            .attributes
            .get_mut(STATE_ATTRIBUTE)
            .unwrap()
            .set_from_string("1", SetAux::default());
        assert!(entity.state_changed());
        assert_eq!(entity.state(), "Inactive");
    }

    #[test]
    fn identity_distinct_but_equal_value_reads_unchanged() {
        // A re-fetch can hand back a brand-new attribute object holding
        // the same option. Under value equality that is not a change.
        let mut entity = entity_with_state(0);
        entity.attributes.insert(state_attr(0));
        assert!(!entity.state_changed());
    }

    #[test]
    fn in_place_mutation_is_observed() {
        let mut entity = entity_with_state(0);
        if let Some(attr) = entity.attributes.get_mut(STATE_ATTRIBUTE) {
            attr.set_from_string("1", SetAux::default());
        }
        assert!(entity.state_changed());
    }

    #[test]
    fn missing_pseudo_fields_read_empty_and_unchanged() {
        let entity = CrmEntity::new("role");
        assert_eq!(entity.state(), "");
        assert_eq!(entity.status(), "");
        assert!(!entity.state_changed());
    }

    #[test]
    fn status_tracks_independently_of_state() {
        let mut attrs = AttributeCollection::new();
        attrs.insert(state_attr(0));
        attrs.insert(CrmAttribute::with_value(
            STATUS_ATTRIBUTE,
            AttributeKind::OptionSet,
            AttributeValue::OptionSet {
                selected: Some(5),
                labels: BTreeMap::new(),
            },
        ));
        let mut entity = CrmEntity::from_parts(None, "systemuser", attrs);

        entity
            .attributes
            .get_mut(STATUS_ATTRIBUTE)
            .unwrap()
            .set_from_string("6", SetAux::default());
        assert!(entity.status_changed());
        assert!(!entity.state_changed());
    }
}
