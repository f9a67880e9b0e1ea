//! Record-source registry and the per-scope session façade.
//!
//! A [`SourceRegistry`] maps each schema generation to an injected
//! builder and hands out one [`RecordSource`] instance per connection
//! scope, constructed on first use. Asking for a version nobody
//! registered is a hard error, never a silent fallback.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crmid_api::{ApiError, RecordSource, SchemaVersion};
use crmid_config::{ConfigError, ConnectionScope};

use crate::adapt;
use crate::cache::{CacheRegistry, ScopedCaches};
use crate::entity::CrmEntity;
use crate::metadata::EntityMetadata;

/// Failures at the registry/source level. The attribute codec and the
/// caches never produce these; they are total by design.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("entity not found: {logical_name} {id}")]
    EntityNotFound { logical_name: String, id: Uuid },

    #[error("no source registered for schema version {0}")]
    UnsupportedVersion(SchemaVersion),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Factory producing a [`RecordSource`] for a validated scope.
pub type SourceBuilder =
    Arc<dyn Fn(&ConnectionScope) -> Result<Arc<dyn RecordSource>, CoreError> + Send + Sync>;

/// Explicit per-version source factory with per-scope instance caching.
#[derive(Default)]
pub struct SourceRegistry {
    builders: DashMap<SchemaVersion, SourceBuilder>,
    instances: DashMap<String, Arc<dyn RecordSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the builder for one schema generation, replacing any
    /// previous registration.
    pub fn register<F>(&self, version: SchemaVersion, builder: F)
    where
        F: Fn(&ConnectionScope) -> Result<Arc<dyn RecordSource>, CoreError>
            + Send
            + Sync
            + 'static,
    {
        self.builders.insert(version, Arc::new(builder));
    }

    /// The source instance for `scope`, built on first use and cached
    /// under the scope key afterwards.
    pub fn source_for(&self, scope: &ConnectionScope) -> Result<Arc<dyn RecordSource>, CoreError> {
        if let Some(existing) = self.instances.get(&scope.scope_key()) {
            return Ok(Arc::clone(&existing));
        }
        let builder = self
            .builders
            .get(&scope.version)
            .ok_or(CoreError::UnsupportedVersion(scope.version))?;
        let source = (builder.value())(scope)?;
        debug!(scope = %scope.scope_key(), version = %scope.version, "constructed record source");
        self.instances
            .insert(scope.scope_key(), Arc::clone(&source));
        Ok(source)
    }

    /// Open a session binding `scope` to its source and cache bundle.
    pub fn session(&self, scope: &ConnectionScope) -> Result<ScopeSession, CoreError> {
        let source = self.source_for(scope)?;
        let caches = CacheRegistry::for_scope(scope);
        Ok(ScopeSession {
            scope: scope.clone(),
            source,
            caches,
        })
    }

    /// Drop all cached instances; registered builders survive.
    pub fn reset(&self) {
        self.instances.clear();
    }
}

/// One connection scope's view of the backend: fetch and save records
/// in canonical form, and read metadata through the scope's cache.
pub struct ScopeSession {
    scope: ConnectionScope,
    source: Arc<dyn RecordSource>,
    caches: Arc<ScopedCaches>,
}

impl ScopeSession {
    pub fn scope(&self) -> &ConnectionScope {
        &self.scope
    }

    pub fn caches(&self) -> &ScopedCaches {
        &self.caches
    }

    /// Fetch one record and adapt it into an entity. A backend
    /// not-found becomes [`CoreError::EntityNotFound`] with the
    /// arguments of this call.
    #[instrument(skip(self), fields(scope = %self.scope.scope_key()))]
    pub fn fetch_entity(&self, logical_name: &str, id: Uuid) -> Result<CrmEntity, CoreError> {
        let native = self
            .source
            .fetch_record(logical_name, id)
            .map_err(|err| match err {
                ApiError::NotFound { .. } => CoreError::EntityNotFound {
                    logical_name: logical_name.to_owned(),
                    id,
                },
                other => CoreError::Api(other),
            })?;
        Ok(adapt::entity_from_native(&native))
    }

    /// Encode an entity into the scope's native shape and write it back.
    #[instrument(skip(self, entity), fields(scope = %self.scope.scope_key(), entity = %entity.logical_name))]
    pub fn save_entity(&self, entity: &CrmEntity) -> Result<(), CoreError> {
        let native = adapt::entity_to_native(entity, self.scope.version);
        self.source.save_record(&native)?;
        Ok(())
    }

    /// Adapted metadata for `logical_name`, served from the scope's
    /// metadata cache when fresh.
    pub fn metadata(&self, logical_name: &str) -> Result<Arc<EntityMetadata>, CoreError> {
        if let Some(hit) = self.caches.metadata.get(logical_name) {
            return Ok(hit);
        }
        let native = self.source.fetch_metadata(logical_name)?;
        Ok(self.caches.metadata.add(EntityMetadata::from(&native)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use secrecy::SecretString;

    use crmid_api::{NativeMetadata, NativeRecord};
    use crmid_config::{AuthCredentials, CacheSettings};

    struct UnreachableSource;

    impl RecordSource for UnreachableSource {
        fn version(&self) -> SchemaVersion {
            SchemaVersion::V3
        }
        fn fetch_record(&self, _: &str, _: Uuid) -> Result<NativeRecord, ApiError> {
            Err(ApiError::Unsupported {
                operation: "fetch_record".into(),
            })
        }
        fn fetch_metadata(&self, _: &str) -> Result<NativeMetadata, ApiError> {
            Err(ApiError::Unsupported {
                operation: "fetch_metadata".into(),
            })
        }
        fn save_record(&self, _: &NativeRecord) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn scope(version: SchemaVersion) -> ConnectionScope {
        ConnectionScope {
            profile: "test".to_owned(),
            organization: "Org".to_owned(),
            service_url: "https://crm.example.com/".parse().unwrap(),
            version,
            auth: AuthCredentials::Token(SecretString::from("t")),
            caches: CacheSettings::default(),
        }
    }

    #[test]
    fn unregistered_version_is_a_hard_error() {
        let registry = SourceRegistry::new();
        registry.register(SchemaVersion::V3, |_| Ok(Arc::new(UnreachableSource)));

        assert!(registry.source_for(&scope(SchemaVersion::V3)).is_ok());
        assert!(matches!(
            registry.source_for(&scope(SchemaVersion::V2011)),
            Err(CoreError::UnsupportedVersion(SchemaVersion::V2011))
        ));
    }

    #[test]
    fn instances_are_cached_per_scope_until_reset() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static BUILDS: AtomicUsize = AtomicUsize::new(0);

        let registry = SourceRegistry::new();
        registry.register(SchemaVersion::V3, |_| {
            BUILDS.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(UnreachableSource))
        });

        let s = scope(SchemaVersion::V3);
        registry.source_for(&s).unwrap();
        registry.source_for(&s).unwrap();
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);

        registry.reset();
        registry.source_for(&s).unwrap();
        assert_eq!(BUILDS.load(Ordering::SeqCst), 2);
    }
}
