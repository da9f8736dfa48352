//! dbcache Core - Query Types, Cache Keys and Errors
//!
//! Pure data structures shared by every other dbcache crate. Nothing in here
//! performs I/O: the key deriver is a pure function of its inputs and the
//! configuration types only parse what they are handed.

pub mod config;
pub mod error;
pub mod key;
pub mod query;

pub use config::CacheSettings;
pub use error::{CacheError, ConfigError, DbCacheError, DbCacheResult, QueryError};
pub use key::{CacheKey, KeyDeriver, DEFAULT_NAMESPACE};
pub use query::{Predicates, QueryDescriptor, QueryResult, Row};
