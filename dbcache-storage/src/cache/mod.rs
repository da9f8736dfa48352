//! Cache store abstraction and the in-memory reference store.
//!
//! The executor only ever reads, writes and removes by key or key prefix.
//! Eviction, expiry and persistence belong to the store behind
//! [`CacheStore`]; [`InMemoryCacheStore`] implements none of them and is
//! meant for tests and process-local caching.

pub mod memory;
pub mod traits;

pub use memory::InMemoryCacheStore;
pub use traits::{CacheStats, CacheStore};
