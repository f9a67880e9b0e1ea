//! Resolved principal types the identity layer caches.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attribute::CrmAttribute;
use crate::cache::Cacheable;
use crate::entity::CrmEntity;

/// A security role, resolved from a `role` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
}

impl Role {
    /// Project a role out of a decoded entity. `None` when the record
    /// has no id or no name.
    pub fn from_entity(entity: &CrmEntity) -> Option<Self> {
        let id = entity.id?;
        let name = entity.attributes.get("name")?.canonical_string();
        if name.is_empty() {
            return None;
        }
        Some(Self { id, name })
    }
}

impl Cacheable for Role {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn size_estimate(&self) -> usize {
        size_of::<Uuid>() + self.name.len()
    }
}

/// A backend user, resolved from a `systemuser` record.
///
/// Indexed by `username` (the login name), which is what the identity
/// layer resolves principals by; `display_name` is presentation only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmUser {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
}

impl CrmUser {
    pub fn from_entity(entity: &CrmEntity) -> Option<Self> {
        let id = entity.id?;
        let username = entity.attributes.get("domainname")?.canonical_string();
        if username.is_empty() {
            return None;
        }
        let display_name = entity
            .attributes
            .get("fullname")
            .map(CrmAttribute::canonical_string)
            .filter(|s| !s.is_empty());
        Some(Self {
            id,
            username,
            display_name,
        })
    }

    /// The name to show for this user, falling back to the login name.
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

impl Cacheable for CrmUser {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.username
    }

    fn size_estimate(&self) -> usize {
        size_of::<Uuid>()
            + self.username.len()
            + self.display_name.as_ref().map_or(0, String::len)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::attribute::{AttributeKind, AttributeValue, CrmAttribute};
    use crate::collection::AttributeCollection;

    fn user_entity(id: Option<Uuid>, username: Option<&str>, full: Option<&str>) -> CrmEntity {
        let mut attributes = AttributeCollection::new();
        if let Some(u) = username {
            attributes.insert(CrmAttribute::with_value(
                "domainname",
                AttributeKind::Text,
                AttributeValue::Text(Some(u.to_owned())),
            ));
        }
        if let Some(f) = full {
            attributes.insert(CrmAttribute::with_value(
                "fullname",
                AttributeKind::Text,
                AttributeValue::Text(Some(f.to_owned())),
            ));
        }
        CrmEntity::from_parts(id, "systemuser", attributes)
    }

    #[test]
    fn user_projection_requires_id_and_username() {
        let id = Uuid::new_v4();
        assert!(CrmUser::from_entity(&user_entity(None, Some("jdoe"), None)).is_none());
        assert!(CrmUser::from_entity(&user_entity(Some(id), None, None)).is_none());

        let user = CrmUser::from_entity(&user_entity(Some(id), Some("jdoe"), None)).unwrap();
        assert_eq!(user.display(), "jdoe");

        let named =
            CrmUser::from_entity(&user_entity(Some(id), Some("jdoe"), Some("Jane Doe"))).unwrap();
        assert_eq!(named.display(), "Jane Doe");
    }

    #[test]
    fn size_estimate_tracks_string_lengths() {
        let short = Role {
            id: Uuid::new_v4(),
            name: "a".to_owned(),
        };
        let long = Role {
            id: Uuid::new_v4(),
            name: "a".repeat(100),
        };
        assert!(long.size_estimate() > short.size_estimate());
    }
}
