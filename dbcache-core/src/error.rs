//! Error types for dbcache operations

use thiserror::Error;

/// Cache store errors.
///
/// `NotFound` is the expected miss signal. Every other variant is a backend
/// failure that the executor logs and treats as a miss.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache entry not found: {key}")]
    NotFound { key: String },

    #[error("Cache backend failure: {reason}")]
    Backend { reason: String },

    #[error("Cache payload serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

impl CacheError {
    /// Build a `NotFound` for the given key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Build a `Backend` failure with a reason.
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }

    /// Whether this is an ordinary miss rather than a backend failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors raised by the authoritative query engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Query on {table} failed: {reason}")]
    ExecutionFailed { table: String, reason: String },

    #[error("Table not found: {table}")]
    TableNotFound { table: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Master error type for all dbcache errors.
#[derive(Debug, Clone, Error)]
pub enum DbCacheError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for dbcache operations.
pub type DbCacheResult<T> = Result<T, DbCacheError>;

// =============================================================================
// TESTS
// =============================================================================
