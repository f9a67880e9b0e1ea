// ── Dual-index object cache ──
//
// Entries are addressable by name and by id. Both indices live behind
// one mutex and are published and invalidated together, so no reader
// can observe a name resolving to an id the cache no longer holds.
// Recency is a counter-clock BTreeMap: the smallest key is always the
// least recently used entry, making eviction O(log n).

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crmid_config::CachePolicy;

use super::Cacheable;

struct Entry<T> {
    value: T,
    bytes: u64,
    inserted_at: Instant,
    recency: u64,
}

struct Inner<T> {
    by_id: HashMap<Uuid, Entry<T>>,
    name_to_id: HashMap<String, Uuid>,
    recency: BTreeMap<u64, Uuid>,
    clock: u64,
    total_bytes: u64,
}

/// A TTL + byte-budget cache of values addressable by id and by name.
///
/// A `ttl_secs` of zero disables the cache: every entry is expired the
/// moment it is inserted.
pub struct ObjectCache<T> {
    label: String,
    policy: CachePolicy,
    inner: Mutex<Inner<T>>,
}

impl<T: Cacheable> ObjectCache<T> {
    pub fn new(label: impl Into<String>, policy: CachePolicy) -> Self {
        Self {
            label: label.into(),
            policy,
            inner: Mutex::new(Inner {
                by_id: HashMap::new(),
                name_to_id: HashMap::new(),
                recency: BTreeMap::new(),
                clock: 0,
                total_bytes: 0,
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Look up by name. Refreshes recency; an expired entry reads as
    /// absent and is dropped from both indices.
    pub fn get(&self, name: &str) -> Option<T> {
        let mut inner = self.inner.lock();
        let id = *inner.name_to_id.get(name)?;
        self.get_live(&mut inner, id)
    }

    /// Look up by id. Same expiry and recency behavior as [`Self::get`].
    pub fn get_by_id(&self, id: Uuid) -> Option<T> {
        let mut inner = self.inner.lock();
        self.get_live(&mut inner, id)
    }

    /// Insert a value, replacing any entry with the same id or the same
    /// name, then evict least-recently-used entries until the byte
    /// budget holds.
    pub fn add(&self, value: T) {
        let mut inner = self.inner.lock();

        // A re-resolved value may have changed its name, or a name may
        // now belong to a different id. Drop both stale entries.
        remove_by_id(&mut inner, value.id());
        if let Some(&stale_id) = inner.name_to_id.get(value.name()) {
            remove_by_id(&mut inner, stale_id);
        }

        let bytes = u64::try_from(value.size_estimate()).unwrap_or(u64::MAX);
        inner.clock += 1;
        let recency = inner.clock;
        inner.name_to_id.insert(value.name().to_owned(), value.id());
        inner.recency.insert(recency, value.id());
        inner.total_bytes += bytes;
        inner.by_id.insert(
            value.id(),
            Entry {
                value,
                bytes,
                inserted_at: Instant::now(),
                recency,
            },
        );

        while inner.total_bytes > self.policy.max_bytes {
            let Some((_, oldest)) = inner.recency.pop_first() else {
                break;
            };
            if let Some(entry) = inner.by_id.remove(&oldest) {
                inner.name_to_id.remove(entry.value.name());
                inner.total_bytes -= entry.bytes;
                debug!(cache = %self.label, id = %oldest, "evicted over byte budget");
            }
        }
    }

    /// Remove by name. Absent names are a no-op.
    pub fn remove(&self, name: &str) -> Option<T> {
        let mut inner = self.inner.lock();
        let id = *inner.name_to_id.get(name)?;
        remove_by_id(&mut inner, id).map(|e| e.value)
    }

    /// Remove by id. Absent ids are a no-op.
    pub fn remove_by_id(&self, id: Uuid) -> Option<T> {
        let mut inner = self.inner.lock();
        remove_by_id(&mut inner, id).map(|e| e.value)
    }

    /// The number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.inner.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.by_id.clear();
        inner.name_to_id.clear();
        inner.recency.clear();
        inner.total_bytes = 0;
    }

    fn get_live(&self, inner: &mut Inner<T>, id: Uuid) -> Option<T> {
        let expired = {
            let entry = inner.by_id.get(&id)?;
            self.policy.ttl_secs == 0 || entry.inserted_at.elapsed() >= self.policy.ttl()
        };
        if expired {
            remove_by_id(inner, id);
            return None;
        }
        inner.clock += 1;
        let clock = inner.clock;
        let entry = inner.by_id.get_mut(&id)?;
        inner.recency.remove(&entry.recency);
        entry.recency = clock;
        inner.recency.insert(clock, id);
        Some(entry.value.clone())
    }
}

fn remove_by_id<T: Cacheable>(inner: &mut Inner<T>, id: Uuid) -> Option<Entry<T>> {
    let entry = inner.by_id.remove(&id)?;
    inner.name_to_id.remove(entry.value.name());
    inner.recency.remove(&entry.recency);
    inner.total_bytes -= entry.bytes;
    Some(entry)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::model::Role;

    fn role(name: &str) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: name.to_owned(),
        }
    }

    fn policy(max_bytes: u64) -> CachePolicy {
        CachePolicy::new(max_bytes, 600)
    }

    #[test]
    fn both_indices_resolve_the_same_entry() {
        let cache = ObjectCache::new("roles:test", policy(4096));
        let editors = role("Editors");
        cache.add(editors.clone());

        assert_eq!(cache.get("Editors"), Some(editors.clone()));
        assert_eq!(cache.get_by_id(editors.id), Some(editors.clone()));

        cache.remove("Editors");
        assert_eq!(cache.get_by_id(editors.id), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn rename_invalidates_the_old_name() {
        let cache = ObjectCache::new("roles:test", policy(4096));
        let id = Uuid::new_v4();
        cache.add(Role { id, name: "Old".to_owned() });
        cache.add(Role { id, name: "New".to_owned() });

        assert_eq!(cache.get("Old"), None);
        assert_eq!(cache.get("New").unwrap().id, id);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn name_reuse_drops_the_previous_holder() {
        let cache = ObjectCache::new("roles:test", policy(4096));
        let first = role("Editors");
        let second = role("Editors");
        cache.add(first.clone());
        cache.add(second.clone());

        assert_eq!(cache.get_by_id(first.id), None);
        assert_eq!(cache.get("Editors"), Some(second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_ttl_reads_as_absent() {
        let cache = ObjectCache::new("roles:test", CachePolicy::new(4096, 0));
        let r = role("Editors");
        cache.add(r.clone());
        assert_eq!(cache.get("Editors"), None);
        assert_eq!(cache.get_by_id(r.id), None);
    }

    #[test]
    fn entries_expire_after_their_lifetime() {
        let cache = ObjectCache::new("roles:test", CachePolicy::new(4096, 1));
        let editors = role("Editors");
        cache.add(editors.clone());
        assert_eq!(cache.get("Editors"), Some(editors.clone()));

        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert_eq!(cache.get("Editors"), None);
        assert_eq!(cache.get_by_id(editors.id), None);
        // The expired entry was dropped from both indices.
        assert!(cache.is_empty());
    }

    #[test]
    fn eviction_prefers_least_recently_used() {
        // Each role is 16 id bytes + 4 name bytes = 20; budget holds two.
        let cache = ObjectCache::new("roles:test", policy(45));
        let a = role("aaaa");
        let b = role("bbbb");
        let c = role("cccc");

        cache.add(a.clone());
        cache.add(b.clone());
        // Touch `a` so `b` is now the oldest.
        assert!(cache.get("aaaa").is_some());

        cache.add(c.clone());
        assert_eq!(cache.get("bbbb"), None);
        assert!(cache.get("aaaa").is_some());
        assert!(cache.get("cccc").is_some());
    }

    #[test]
    fn concurrent_adds_and_gets_stay_coherent() {
        let cache = std::sync::Arc::new(ObjectCache::new("roles:test", policy(1 << 20)));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = std::sync::Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let name = format!("role-{t}-{}", i % 5);
                        cache.add(Role {
                            id: Uuid::new_v4(),
                            name: name.clone(),
                        });
                        if let Some(hit) = cache.get(&name) {
                            assert_eq!(cache.get_by_id(hit.id).map(|r| r.name), Some(name));
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
