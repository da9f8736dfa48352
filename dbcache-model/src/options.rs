//! Per-call read options and the model's cache state.

use std::fmt;

/// Where a model stands with respect to its cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No cache store attached; every read goes to the engine.
    Unconfigured,
    /// The next read consults the cache.
    ActiveUse,
    /// The next read bypasses the cache, once.
    ActiveSkip,
}

/// Options for a single read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Consult the cache and write the result back on a miss.
    pub use_cache: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { use_cache: true }
    }
}

impl ReadOptions {
    /// Read straight from the engine without touching the cache.
    pub fn bypass() -> Self {
        Self { use_cache: false }
    }
}

/// How a read was served. Logged with every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Hit,
    Miss,
    BackendError,
    Bypassed,
}

impl ReadOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::BackendError => "backend_error",
            Self::Bypassed => "bypassed",
        }
    }
}

impl fmt::Display for ReadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_options() {
        assert!(ReadOptions::default().use_cache);
        assert!(!ReadOptions::bypass().use_cache);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(ReadOutcome::BackendError.to_string(), "backend_error");
        assert_eq!(ReadOutcome::Hit.as_str(), "hit");
    }
}
