//! Cache store trait and usage statistics.

use dbcache_core::{CacheError, CacheKey, QueryResult};

/// Key-value store holding cached query results.
///
/// Implementations must be thread-safe. They own serialization of the
/// payload and any eviction or expiry policy.
pub trait CacheStore: Send + Sync {
    /// Read the result cached under `key`.
    ///
    /// A miss is reported as [`CacheError::NotFound`]; any other error is a
    /// backend failure.
    fn read(&self, key: &CacheKey) -> Result<QueryResult, CacheError>;

    /// Store `result` under `key`, replacing any previous entry.
    fn write(&self, key: &CacheKey, result: &QueryResult) -> Result<(), CacheError>;

    /// Remove the entry stored under `key_or_prefix`, or every entry whose
    /// key starts with it when `is_prefix` is set.
    ///
    /// Returns the number of removed entries. Removing an absent key is not
    /// an error.
    fn remove(&self, key_or_prefix: &str, is_prefix: bool) -> Result<u64, CacheError>;

    /// Usage statistics. Stores that do not track them report zeros.
    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Approximate payload size in bytes.
    pub memory_bytes: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
