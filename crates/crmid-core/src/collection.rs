// ── Attribute collection ──
//
// Name-keyed, insertion-ordered container of attributes bound to one
// entity record. Lookup order is irrelevant; iteration order preserves
// the native field order so write-back keeps the original field identity.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::attribute::{AttributeKind, CrmAttribute, SetAux};

/// The attributes of one entity record. Names are unique; `create`
/// overwrites an existing attribute of the same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeCollection {
    attributes: IndexMap<String, CrmAttribute>,
}

impl AttributeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an attribute by name. Missing names are not an error.
    pub fn get(&self, name: &str) -> Option<&CrmAttribute> {
        self.attributes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CrmAttribute> {
        self.attributes.get_mut(name)
    }

    /// Construct an attribute from a canonical string and insert it,
    /// overwriting any existing attribute of the same name. The
    /// unsupported kind flows through like any other.
    pub fn create(&mut self, name: &str, kind: AttributeKind, value: &str, aux: SetAux<'_>) {
        let mut attr = CrmAttribute::new(name, kind);
        attr.set_from_string(value, aux);
        self.insert(attr);
    }

    /// Insert an already-built attribute, overwriting by name. Adapter
    /// entry point. Names must be non-empty; an empty-named attribute
    /// has no field identity to write back to and is dropped.
    pub fn insert(&mut self, attr: CrmAttribute) {
        if attr.name.is_empty() {
            trace!("dropping attribute with empty name");
            return;
        }
        self.attributes.insert(attr.name.clone(), attr);
    }

    /// Remove an attribute if present; a no-op otherwise.
    pub fn remove(&mut self, name: &str) -> Option<CrmAttribute> {
        // shift_remove keeps the remaining field order intact.
        self.attributes.shift_remove(name)
    }

    /// Iterate `(name, attribute)` pairs in native field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CrmAttribute)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<'a> IntoIterator for &'a AttributeCollection {
    type Item = (&'a str, &'a CrmAttribute);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a CrmAttribute)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn create_overwrites_same_name() {
        let mut col = AttributeCollection::new();
        col.create("fullname", AttributeKind::Text, "Jane", SetAux::default());
        col.create("fullname", AttributeKind::Text, "Janet", SetAux::default());

        assert_eq!(col.len(), 1);
        assert_eq!(col.get("fullname").unwrap().canonical_string(), "Janet");
    }

    #[test]
    fn names_stay_unique_across_any_create_sequence() {
        let mut col = AttributeCollection::new();
        for i in 0..10 {
            col.create(
                "counter",
                AttributeKind::Integer,
                &i.to_string(),
                SetAux::default(),
            );
            col.create("other", AttributeKind::Text, "x", SetAux::default());
        }
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn remove_then_get_is_not_found() {
        let mut col = AttributeCollection::new();
        col.create("a", AttributeKind::Text, "1", SetAux::default());

        assert!(col.remove("a").is_some());
        assert!(col.get("a").is_none());

        // Removing a name that was never present is a no-op.
        assert!(col.remove("never-there").is_none());
        assert!(col.get("never-there").is_none());
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut col = AttributeCollection::new();
        for name in ["zeta", "alpha", "mid"] {
            col.create(name, AttributeKind::Text, name, SetAux::default());
        }
        let order: Vec<&str> = col.iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn empty_names_are_dropped() {
        let mut col = AttributeCollection::new();
        col.create("", AttributeKind::Text, "ghost", SetAux::default());
        col.insert(CrmAttribute::new("", AttributeKind::Integer));

        assert!(col.is_empty());
        assert!(col.get("").is_none());
    }

    #[test]
    fn unsupported_kind_needs_no_special_casing() {
        let mut col = AttributeCollection::new();
        col.create("mystery", AttributeKind::Unsupported, "x", SetAux::default());
        assert_eq!(col.get("mystery").unwrap().canonical_string(), "");
    }
}
