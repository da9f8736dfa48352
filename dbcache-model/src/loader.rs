//! Model loader.
//!
//! Builds [`CachedModel`]s with their collaborators injected up front: the
//! shared query engine, the shared cache store, and the cache settings.

use std::sync::Arc;

use dbcache_core::CacheSettings;
use dbcache_storage::{CacheStore, QueryEngine};

use crate::model::CachedModel;

/// Factory for cache-aware models sharing one engine and one cache store.
pub struct ModelLoader {
    engine: Arc<dyn QueryEngine>,
    cache: Option<Arc<dyn CacheStore>>,
    settings: CacheSettings,
}

impl ModelLoader {
    pub fn new(engine: Arc<dyn QueryEngine>, settings: CacheSettings) -> Self {
        Self {
            engine,
            cache: None,
            settings,
        }
    }

    /// Supply the cache store attached to loaded models.
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Load a model for `table`.
    ///
    /// The cache store is attached only when caching is enabled and a store
    /// was supplied. Enabled caching without a store is logged as an error
    /// and the model is returned unconfigured.
    pub fn load(&self, table: &str, primary_key: Option<&str>) -> CachedModel {
        let mut model = CachedModel::new(table, Arc::clone(&self.engine))
            .with_primary_key(primary_key.unwrap_or_default())
            .with_settings(&self.settings);

        if !self.settings.enabled {
            tracing::debug!(table, "Caching disabled, loading model without cache");
            return model;
        }

        match &self.cache {
            Some(cache) => {
                model.attach_cache(Arc::clone(cache));
            }
            None => {
                tracing::error!(
                    table,
                    "Caching is enabled but no cache store is configured. Unable to attach cache to model."
                );
            }
        }

        model
    }
}

impl std::fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelLoader")
            .field("has_cache", &self.cache.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
