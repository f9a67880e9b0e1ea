// ── Per-scope cache registry ──
//
// One `ScopedCaches` bundle per connection scope, constructed lazily on
// first request and held in a process-wide map keyed by
// `ConnectionScope::scope_key`. Scopes never share instances: two
// profiles pointing at different organizations get disjoint bundles.
// `reset_all` exists so tests can start from a cold registry; nothing
// else mutates the map wholesale.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::debug;

use crmid_config::ConnectionScope;

use crate::model::{CrmUser, Role};

use super::object::ObjectCache;
use super::string::{MetadataCache, StringCache};

/// The five cache instances belonging to one connection scope.
pub struct ScopedCaches {
    /// Resolved roles, by name and id.
    pub roles: ObjectCache<Role>,
    /// Resolved users, by username and id.
    pub users: ObjectCache<CrmUser>,
    /// Role name → serialized member list.
    pub members: StringCache,
    /// Username → serialized role list.
    pub member_of: StringCache,
    /// Logical name → adapted entity-type metadata.
    pub metadata: MetadataCache,
}

impl ScopedCaches {
    /// Build the bundle for `scope`, applying its per-kind policies.
    /// Instance labels are `"{kind}:{organization}"`.
    fn new(scope: &ConnectionScope) -> Self {
        let org = &scope.organization;
        Self {
            roles: ObjectCache::new(format!("roles:{org}"), scope.caches.roles),
            users: ObjectCache::new(format!("users:{org}"), scope.caches.users),
            members: StringCache::new(format!("members:{org}"), scope.caches.members),
            member_of: StringCache::new(format!("member_of:{org}"), scope.caches.member_of),
            metadata: MetadataCache::new(format!("metadata:{org}"), scope.caches.metadata),
        }
    }

    /// Drop every entry in every cache of this scope.
    pub fn clear(&self) {
        self.roles.clear();
        self.users.clear();
        self.members.clear();
        self.member_of.clear();
        self.metadata.clear();
    }
}

fn registry() -> &'static DashMap<String, Arc<ScopedCaches>> {
    static REGISTRY: OnceLock<DashMap<String, Arc<ScopedCaches>>> = OnceLock::new();
    REGISTRY.get_or_init(DashMap::new)
}

/// Process-wide access to per-scope cache bundles.
pub struct CacheRegistry;

impl CacheRegistry {
    /// The cache bundle for `scope`, constructing it on first use.
    pub fn for_scope(scope: &ConnectionScope) -> Arc<ScopedCaches> {
        registry()
            .entry(scope.scope_key())
            .or_insert_with(|| {
                debug!(scope = %scope.scope_key(), "constructing cache bundle");
                Arc::new(ScopedCaches::new(scope))
            })
            .clone()
    }

    /// The number of scopes with a constructed bundle.
    pub fn scope_count() -> usize {
        registry().len()
    }

    /// Drop every bundle for every scope. Bundles already handed out
    /// keep working; the next `for_scope` call constructs a fresh one.
    pub fn reset_all() {
        registry().clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use secrecy::SecretString;
    use uuid::Uuid;

    use crmid_api::SchemaVersion;
    use crmid_config::{AuthCredentials, CacheSettings};

    // These tests mutate the process-wide registry; serialize them.
    static REGISTRY_TEST_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

    fn scope(profile: &str, organization: &str) -> ConnectionScope {
        ConnectionScope {
            profile: profile.to_owned(),
            organization: organization.to_owned(),
            service_url: "https://crm.example.com/service.svc".parse().unwrap(),
            version: SchemaVersion::V2011,
            auth: AuthCredentials::Token(SecretString::from("t")),
            caches: CacheSettings::default(),
        }
    }

    #[test]
    fn scopes_are_isolated_and_stable() {
        let _guard = REGISTRY_TEST_LOCK.lock();
        CacheRegistry::reset_all();
        let org1 = scope("prod", "Org1");
        let org2 = scope("prod", "Org2");

        let a = CacheRegistry::for_scope(&org1);
        a.roles.add(Role {
            id: Uuid::new_v4(),
            name: "Editors".to_owned(),
        });

        // Same scope resolves to the same bundle.
        let a_again = CacheRegistry::for_scope(&org1);
        assert!(Arc::ptr_eq(&a, &a_again));
        assert!(a_again.roles.get("Editors").is_some());

        // A different organization sees nothing.
        let b = CacheRegistry::for_scope(&org2);
        assert!(b.roles.get("Editors").is_none());
        assert_eq!(b.roles.label(), "roles:Org2");
    }

    #[test]
    fn reset_forgets_constructed_bundles() {
        let _guard = REGISTRY_TEST_LOCK.lock();
        CacheRegistry::reset_all();
        let s = scope("lab", "Reset");
        let bundle = CacheRegistry::for_scope(&s);
        bundle.members.add("Editors", "jdoe");

        CacheRegistry::reset_all();
        let fresh = CacheRegistry::for_scope(&s);
        assert!(!Arc::ptr_eq(&bundle, &fresh));
        assert!(fresh.members.get("Editors").is_none());
    }
}
