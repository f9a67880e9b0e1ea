// ── String-keyed caches ──
//
// Same TTL/budget/LRU contract as the object cache, but keyed by a
// single string. Backs the membership caches (role-name → member list,
// username → role list) and the adapted-metadata cache.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;

use crmid_config::CachePolicy;

use crate::metadata::EntityMetadata;

/// Byte estimate used for budget accounting.
trait ByteSized {
    fn byte_size(&self) -> usize;
}

impl ByteSized for String {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl ByteSized for Arc<EntityMetadata> {
    fn byte_size(&self) -> usize {
        let per_attribute: usize = self
            .attributes
            .iter()
            .map(|a| {
                a.logical_name.len()
                    + a.display_name.as_ref().map_or(0, String::len)
                    + a.options
                        .iter()
                        .map(|o| 4 + o.label.as_ref().map_or(0, String::len))
                        .sum::<usize>()
                    + 16
            })
            .sum();
        self.logical_name.len()
            + self.display_name.as_ref().map_or(0, String::len)
            + self.primary_key.as_ref().map_or(0, String::len)
            + self.primary_field.as_ref().map_or(0, String::len)
            + per_attribute
    }
}

struct Entry<V> {
    value: V,
    bytes: u64,
    inserted_at: Instant,
    recency: u64,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    recency: BTreeMap<u64, String>,
    clock: u64,
    total_bytes: u64,
}

struct TtlMap<V> {
    label: String,
    policy: CachePolicy,
    inner: Mutex<Inner<V>>,
}

impl<V: ByteSized + Clone> TtlMap<V> {
    fn new(label: String, policy: CachePolicy) -> Self {
        Self {
            label,
            policy,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                clock: 0,
                total_bytes: 0,
            }),
        }
    }

    fn get(&self, key: &str) -> Option<V> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let expired = {
            let entry = inner.entries.get(key)?;
            self.policy.ttl_secs == 0 || entry.inserted_at.elapsed() >= self.policy.ttl()
        };
        if expired {
            remove(inner, key);
            return None;
        }
        inner.clock += 1;
        let clock = inner.clock;
        let entry = inner.entries.get_mut(key)?;
        inner.recency.remove(&entry.recency);
        entry.recency = clock;
        inner.recency.insert(clock, key.to_owned());
        Some(entry.value.clone())
    }

    fn add(&self, key: &str, value: V) {
        let mut inner = self.inner.lock();
        remove(&mut inner, key);

        let bytes = u64::try_from(key.len() + value.byte_size()).unwrap_or(u64::MAX);
        inner.clock += 1;
        let recency = inner.clock;
        inner.recency.insert(recency, key.to_owned());
        inner.total_bytes += bytes;
        inner.entries.insert(
            key.to_owned(),
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
            if let Some(entry) = inner.entries.remove(&oldest) {
                inner.total_bytes -= entry.bytes;
                debug!(cache = %self.label, key = %oldest, "evicted over byte budget");
            }
        }
    }

    fn remove(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        remove(&mut inner, key)
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
        inner.total_bytes = 0;
    }
}

fn remove<V>(inner: &mut Inner<V>, key: &str) -> Option<V> {
    let entry = inner.entries.remove(key)?;
    inner.recency.remove(&entry.recency);
    inner.total_bytes -= entry.bytes;
    Some(entry.value)
}

/// TTL + byte-budget cache of string payloads.
pub struct StringCache {
    map: TtlMap<String>,
}

impl StringCache {
    pub fn new(label: impl Into<String>, policy: CachePolicy) -> Self {
        Self {
            map: TtlMap::new(label.into(), policy),
        }
    }

    pub fn label(&self) -> &str {
        &self.map.label
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key)
    }

    pub fn add(&self, key: &str, value: impl Into<String>) {
        self.map.add(key, value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.map.remove(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.len() == 0
    }

    pub fn clear(&self) {
        self.map.clear();
    }
}

/// TTL + byte-budget cache of adapted entity-type metadata, keyed by
/// logical name. Values are shared, not cloned.
pub struct MetadataCache {
    map: TtlMap<Arc<EntityMetadata>>,
}

impl MetadataCache {
    pub fn new(label: impl Into<String>, policy: CachePolicy) -> Self {
        Self {
            map: TtlMap::new(label.into(), policy),
        }
    }

    pub fn label(&self) -> &str {
        &self.map.label
    }

    pub fn get(&self, logical_name: &str) -> Option<Arc<EntityMetadata>> {
        self.map.get(logical_name)
    }

    pub fn add(&self, metadata: EntityMetadata) -> Arc<EntityMetadata> {
        let shared = Arc::new(metadata);
        let key = shared.logical_name.clone();
        self.map.add(&key, Arc::clone(&shared));
        shared
    }

    pub fn remove(&self, logical_name: &str) -> Option<Arc<EntityMetadata>> {
        self.map.remove(logical_name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.len() == 0
    }

    pub fn clear(&self) {
        self.map.clear();
    }
}
