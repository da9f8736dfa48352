//! Cache-aside model.
//!
//! Two layers:
//!
//! - [`CachedModel::read_with`] / [`CachedModel::write_with`] take everything
//!   they need as arguments and borrow the model immutably.
//! - [`CachedModel::read`] / [`CachedModel::write`] are the stateful caller
//!   API. Pending predicates, the cache group and the skip flag are set on the
//!   model beforehand and taken (left empty) by the next call.

use std::mem;
use std::sync::Arc;

use dbcache_core::{
    CacheKey, CacheSettings, DbCacheResult, KeyDeriver, Predicates, QueryDescriptor, QueryResult,
    Row,
};
use dbcache_storage::{CacheStore, QueryEngine};

use crate::options::{CacheState, ReadOptions, ReadOutcome};

/// A table-bound model whose selects go through a result cache.
pub struct CachedModel {
    table: String,
    primary_key: Option<String>,
    engine: Arc<dyn QueryEngine>,
    cache: Option<Arc<dyn CacheStore>>,
    keys: KeyDeriver,
    warn_missing_primary_key: bool,
    skip_next: bool,
    pending_group: Option<String>,
    pending_predicates: String,
}

impl CachedModel {
    /// Create an unconfigured model for `table`.
    pub fn new(table: impl Into<String>, engine: Arc<dyn QueryEngine>) -> Self {
        let defaults = CacheSettings::default();
        Self {
            table: table.into(),
            primary_key: None,
            engine,
            cache: None,
            keys: KeyDeriver::new(defaults.namespace),
            warn_missing_primary_key: defaults.warn_missing_primary_key,
            skip_next: false,
            pending_group: None,
            pending_predicates: String::new(),
        }
    }

    /// Set the primary key column. An empty name leaves it unset.
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        let primary_key = primary_key.into();
        self.primary_key = (!primary_key.is_empty()).then_some(primary_key);
        self
    }

    /// Apply key namespace and diagnostics settings.
    pub fn with_settings(mut self, settings: &CacheSettings) -> Self {
        self.keys = KeyDeriver::new(settings.namespace.clone());
        self.warn_missing_primary_key = settings.warn_missing_primary_key;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn key_deriver(&self) -> &KeyDeriver {
        &self.keys
    }

    pub fn state(&self) -> CacheState {
        match (&self.cache, self.skip_next) {
            (None, _) => CacheState::Unconfigured,
            (Some(_), false) => CacheState::ActiveUse,
            (Some(_), true) => CacheState::ActiveSkip,
        }
    }

    // ========================================================================
    // Stateful caller API
    // ========================================================================

    /// Attach a cache store. Subsequent reads consult it.
    pub fn attach_cache(&mut self, cache: Arc<dyn CacheStore>) -> &mut Self {
        self.cache = Some(cache);
        self.skip_next = false;
        self
    }

    /// Bypass the cache for the next read only, neither reading from nor
    /// writing to it. No-op on an unconfigured model.
    pub fn skip_cache(&mut self) -> &mut Self {
        if self.cache.is_some() {
            self.skip_next = true;
        }
        self
    }

    /// Set the cache group consumed by the next read or write.
    pub fn set_cache_group(&mut self, group: impl Into<String>) -> &mut Self {
        let group = group.into();
        self.pending_group = (!group.is_empty()).then_some(group);
        self
    }

    /// Set the predicates for the next read or write.
    pub fn filter<P: Predicates + ?Sized>(&mut self, predicates: &P) -> &mut Self {
        self.pending_predicates = predicates.convert();
        self
    }

    /// Select `columns` using the pending predicates, group and skip flag.
    ///
    /// All three are reset whether the read succeeds or not.
    pub fn read<S: AsRef<str>>(&mut self, columns: &[S]) -> DbCacheResult<QueryResult> {
        let descriptor = QueryDescriptor {
            table: self.table.clone(),
            predicates: mem::take(&mut self.pending_predicates),
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            group: self.pending_group.take(),
        };
        let options = ReadOptions {
            use_cache: !mem::take(&mut self.skip_next),
        };
        self.read_with(&descriptor, options)
    }

    /// Write `values` using the pending predicates, invalidating the pending
    /// group first.
    pub fn write(&mut self, values: &Row) -> DbCacheResult<u64> {
        let descriptor = QueryDescriptor {
            table: self.table.clone(),
            predicates: mem::take(&mut self.pending_predicates),
            columns: values.keys().cloned().collect(),
            group: self.pending_group.take(),
        };
        self.write_with(&descriptor, values)
    }

    // ========================================================================
    // Per-call API
    // ========================================================================

    /// Read through the cache.
    ///
    /// Cache misses and cache failures fall back to the engine. Only engine
    /// errors are returned.
    pub fn read_with(
        &self,
        descriptor: &QueryDescriptor,
        options: ReadOptions,
    ) -> DbCacheResult<QueryResult> {
        self.check_primary_key();
        let key = self.keys.derive(descriptor);

        let cache = self.cache.as_ref().filter(|_| options.use_cache);
        let outcome = match cache {
            Some(cache) => match lookup(&**cache, &key) {
                Ok(result) => {
                    tracing::debug!(table = %descriptor.table, key = %key, outcome = %ReadOutcome::Hit, "Served query from cache");
                    return Ok(result);
                }
                Err(outcome) => outcome,
            },
            None => ReadOutcome::Bypassed,
        };

        let result = self.engine.execute_select(descriptor)?;

        if let Some(cache) = cache {
            if let Err(e) = cache.write(&key, &result) {
                tracing::warn!(table = %descriptor.table, key = %key, error = %e, "Failed to store query result in cache");
            }
        }

        tracing::debug!(table = %descriptor.table, key = %key, outcome = %outcome, rows = result.len(), "Served query from engine");
        Ok(result)
    }

    /// Invalidate the descriptor's group, then write through the engine.
    ///
    /// The group is removed under the descriptor's table, the same table its
    /// read keys were derived from. The engine's outcome is returned
    /// unchanged; invalidation failures are only logged.
    pub fn write_with(&self, descriptor: &QueryDescriptor, values: &Row) -> DbCacheResult<u64> {
        if let Some(group) = descriptor.group.as_deref() {
            self.invalidate(&descriptor.table, group);
        }
        Ok(self.engine.execute_write(descriptor, values)?)
    }

    /// Remove every cached entry of this table stored under `group`.
    ///
    /// Returns the number of removed entries; 0 when unconfigured, when the
    /// group is empty, or when the store fails.
    pub fn invalidate_group(&self, group: &str) -> u64 {
        self.invalidate(&self.table, group)
    }

    fn invalidate(&self, table: &str, group: &str) -> u64 {
        let Some(cache) = self.cache.as_ref() else {
            return 0;
        };
        if group.is_empty() {
            return 0;
        }

        let prefix = self.keys.group_prefix(table, group);
        match cache.remove(&prefix, true) {
            Ok(removed) => {
                tracing::info!(table, group, removed, "Invalidated cache group");
                removed
            }
            Err(e) => {
                tracing::warn!(table, group, error = %e, "Failed to invalidate cache group");
                0
            }
        }
    }

    fn check_primary_key(&self) {
        if self.warn_missing_primary_key && self.primary_key.is_none() {
            tracing::warn!(model = %self.table, "Primary key of model not set");
        }
    }
}

fn lookup(cache: &dyn CacheStore, key: &CacheKey) -> Result<QueryResult, ReadOutcome> {
    match cache.read(key) {
        Ok(result) => Ok(result),
        Err(e) if e.is_not_found() => {
            tracing::info!(key = %key, "Data not found for query");
            Err(ReadOutcome::Miss)
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Cache lookup failed, falling back to query engine");
            Err(ReadOutcome::BackendError)
        }
    }
}

impl std::fmt::Debug for CachedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedModel")
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("state", &self.state())
            .field("namespace", &self.keys.namespace())
            .field("pending_group", &self.pending_group)
            .finish_non_exhaustive()
    }
}
