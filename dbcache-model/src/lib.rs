//! dbcache Model - Cache-Aside Model Decorator
//!
//! [`CachedModel`] wraps a [`QueryEngine`](dbcache_storage::QueryEngine) and
//! serves selects from a [`CacheStore`](dbcache_storage::CacheStore) when it
//! can, falling back to the engine and writing the result back on a miss.
//! Nothing in the cache layer can fail a read or a write: cache outages cost
//! latency, never correctness.
//!
//! [`ModelLoader`] is where models get their collaborators: it builds each
//! model with the configured key namespace and attaches the shared cache
//! store when caching is enabled.

pub mod loader;
pub mod model;
pub mod options;

pub use loader::ModelLoader;
pub use model::CachedModel;
pub use options::{CacheState, ReadOptions, ReadOutcome};
