//! dbcache Storage - Cache Store and Query Engine Traits
//!
//! Defines the two capabilities a cached model consumes: the cache store
//! that holds derived results and the authoritative query engine behind it.

pub mod cache;

pub use cache::{CacheStats, CacheStore, InMemoryCacheStore};

use dbcache_core::{QueryDescriptor, QueryError, QueryResult, Row};

// ============================================================================
// QUERY ENGINE TRAIT
// ============================================================================

/// The authoritative data source a cached model decorates.
///
/// Implementations build and run the real statement from the descriptor;
/// the cache layer never inspects the SQL.
pub trait QueryEngine: Send + Sync {
    /// Run a select for the descriptor's table, predicates and columns.
    fn execute_select(&self, descriptor: &QueryDescriptor) -> Result<QueryResult, QueryError>;

    /// Run a write of `values` against the descriptor's table, restricted by
    /// its predicates. Returns the number of affected rows.
    fn execute_write(&self, descriptor: &QueryDescriptor, values: &Row) -> Result<u64, QueryError>;
}
