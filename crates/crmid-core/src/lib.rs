//! crmid-core: canonical attribute model and scoped lookup caches for a
//! CRM-backed identity layer.
//!
//! Three mutually incompatible backend schema generations are adapted
//! into one attribute model ([`attribute`], [`adapt`]), collected per
//! record ([`collection`], [`entity`]), described by unified metadata
//! ([`metadata`]), and served through per-connection-scope TTL/LRU
//! caches ([`cache`]). [`source`] binds it together: an explicit
//! per-version source registry and a session façade per scope.
//!
//! Design rule throughout: the codec and the caches are total — decode
//! never fails, unparsable writes are silent no-ops, expired cache
//! entries read as absent. Errors exist only at the registry/source
//! boundary ([`CoreError`]).

pub mod adapt;
pub mod attribute;
pub mod cache;
pub mod collection;
pub mod entity;
pub mod metadata;
pub mod model;
pub mod source;

pub use attribute::{AttributeKind, AttributeValue, CrmAttribute, Reference, SetAux};
pub use cache::{CacheRegistry, Cacheable, MetadataCache, ObjectCache, ScopedCaches, StringCache};
pub use collection::AttributeCollection;
pub use entity::{CrmEntity, STATE_ATTRIBUTE, STATUS_ATTRIBUTE};
pub use metadata::{AttributeMetadata, EntityMetadata, OptionMetadata, RequiredLevel};
pub use model::{CrmUser, Role};
pub use source::{CoreError, ScopeSession, SourceBuilder, SourceRegistry};
