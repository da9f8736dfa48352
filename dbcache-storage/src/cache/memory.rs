//! In-memory cache store.
//!
//! Entries are kept as JSON bytes in an ordered map, so a group removal is a
//! range scan starting at the prefix rather than a walk over every key.

use std::collections::BTreeMap;
use std::sync::RwLock;

use dbcache_core::{CacheError, CacheKey, QueryResult};

use super::traits::{CacheStats, CacheStore};

/// Process-local cache store with no eviction or expiry.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
    stats: RwLock<CacheStats>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an entry exists under `key`. Does not count as a hit or miss.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(key.as_str()))
            .unwrap_or(false)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and reset statistics.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.entries
            .write()
            .map_err(|_| CacheError::LockPoisoned)?
            .clear();
        *self.stats.write().map_err(|_| CacheError::LockPoisoned)? = CacheStats::default();
        Ok(())
    }

    fn record_lookup(&self, hit: bool) {
        if let Ok(mut stats) = self.stats.write() {
            if hit {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
        }
    }

    fn record_removed(&self, removed: u64, bytes: u64) {
        if let Ok(mut stats) = self.stats.write() {
            stats.entry_count = stats.entry_count.saturating_sub(removed);
            stats.memory_bytes = stats.memory_bytes.saturating_sub(bytes);
        }
    }
}

impl CacheStore for InMemoryCacheStore {
    fn read(&self, key: &CacheKey) -> Result<QueryResult, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
        match entries.get(key.as_str()) {
            Some(bytes) => {
                self.record_lookup(true);
                serde_json::from_slice(bytes).map_err(|e| CacheError::Serialization {
                    reason: e.to_string(),
                })
            }
            None => {
                self.record_lookup(false);
                Err(CacheError::not_found(key.as_str()))
            }
        }
    }

    fn write(&self, key: &CacheKey, result: &QueryResult) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(result).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        let new_len = bytes.len() as u64;

        let previous = self
            .entries
            .write()
            .map_err(|_| CacheError::LockPoisoned)?
            .insert(key.as_str().to_string(), bytes);

        if let Ok(mut stats) = self.stats.write() {
            match previous {
                Some(old) => {
                    stats.memory_bytes = stats.memory_bytes.saturating_sub(old.len() as u64);
                }
                None => stats.entry_count += 1,
            }
            stats.memory_bytes += new_len;
        }

        Ok(())
    }

    fn remove(&self, key_or_prefix: &str, is_prefix: bool) -> Result<u64, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;

        let doomed: Vec<String> = if is_prefix {
            entries
                .range(key_or_prefix.to_string()..)
                .take_while(|(key, _)| key.starts_with(key_or_prefix))
                .map(|(key, _)| key.clone())
                .collect()
        } else {
            entries
                .contains_key(key_or_prefix)
                .then(|| key_or_prefix.to_string())
                .into_iter()
                .collect()
        };

        let mut bytes = 0u64;
        for key in &doomed {
            if let Some(payload) = entries.remove(key) {
                bytes += payload.len() as u64;
            }
        }
        drop(entries);

        let removed = doomed.len() as u64;
        self.record_removed(removed, bytes);
        tracing::debug!(target_key = key_or_prefix, is_prefix, removed, "Removed cache entries");
        Ok(removed)
    }

    fn stats(&self) -> CacheStats {
        self.stats
            .read()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }
}
