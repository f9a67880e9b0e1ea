//! Scoped lookup caches.
//!
//! Each connection scope owns five independent cache instances (roles,
//! users, two membership string caches, metadata), handed out by the
//! process-wide [`CacheRegistry`]. Every cache applies the same contract:
//! a fixed TTL stamped at insertion, a byte budget enforced by
//! least-recently-used eviction, and expired entries reading as absent.
//! No cache operation performs I/O or returns an error.

pub mod object;
pub mod registry;
pub mod string;

pub use object::ObjectCache;
pub use registry::{CacheRegistry, ScopedCaches};
pub use string::{MetadataCache, StringCache};

use uuid::Uuid;

/// A value an [`ObjectCache`] can hold: addressable by id and by a
/// unique name, with a byte estimate for budget accounting.
pub trait Cacheable: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
    fn size_estimate(&self) -> usize;
}
