//! Cache configuration.
//!
//! Settings can be built in code, parsed from a TOML table, or read from
//! environment variables. Every field has a default, so an empty TOML
//! document or an empty environment both yield [`CacheSettings::default`].

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::key::DEFAULT_NAMESPACE;

/// Settings for cache-aware models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Whether loaded models get the cache store attached.
    pub enabled: bool,
    /// Prefix for every derived cache key.
    pub namespace: String,
    /// Log a warning when a model without a primary key reads.
    pub warn_missing_primary_key: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: DEFAULT_NAMESPACE.to_string(),
            warn_missing_primary_key: true,
        }
    }
}

impl CacheSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable caching for loaded models.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Enable or disable the missing primary key warning.
    pub fn with_primary_key_warning(mut self, enabled: bool) -> Self {
        self.warn_missing_primary_key = enabled;
        self
    }

    /// Create settings from environment variables.
    ///
    /// Environment variables:
    /// - `DBCACHE_ENABLED`: "true" or "false" (default: true)
    /// - `DBCACHE_NAMESPACE`: key namespace (default: "database_")
    /// - `DBCACHE_WARN_MISSING_PRIMARY_KEY`: "true" or "false" (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parse settings from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(source).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check invariants the rest of the crate relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "namespace".to_string(),
                value: self.namespace.clone(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let enabled = match lookup("DBCACHE_ENABLED") {
            Some(value) => parse_bool("DBCACHE_ENABLED", &value)?,
            None => defaults.enabled,
        };

        let namespace = lookup("DBCACHE_NAMESPACE").unwrap_or(defaults.namespace);

        let warn_missing_primary_key = match lookup("DBCACHE_WARN_MISSING_PRIMARY_KEY") {
            Some(value) => parse_bool("DBCACHE_WARN_MISSING_PRIMARY_KEY", &value)?,
            None => defaults.warn_missing_primary_key,
        };

        let settings = Self {
            enabled,
            namespace,
            warn_missing_primary_key,
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = CacheSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.namespace, "database_");
        assert!(settings.warn_missing_primary_key);
    }

    #[test]
    fn test_builder() {
        let settings = CacheSettings::new()
            .with_enabled(false)
            .with_namespace("app_")
            .with_primary_key_warning(false);

        assert!(!settings.enabled);
        assert_eq!(settings.namespace, "app_");
        assert!(!settings.warn_missing_primary_key);
    }

    #[test]
    fn test_from_toml_partial() {
        let settings = CacheSettings::from_toml_str("namespace = \"cache_\"").unwrap();
        assert_eq!(settings.namespace, "cache_");
        assert!(settings.enabled);
    }

    #[test]
    fn test_from_toml_empty_is_default() {
        assert_eq!(CacheSettings::from_toml_str("").unwrap(), CacheSettings::default());
    }

    #[test]
    fn test_from_toml_rejects_empty_namespace() {
        let err = CacheSettings::from_toml_str("namespace = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_from_toml_rejects_bad_type() {
        let err = CacheSettings::from_toml_str("enabled = \"sometimes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_from_lookup() {
        let settings = CacheSettings::from_lookup(lookup(&[
            ("DBCACHE_ENABLED", "false"),
            ("DBCACHE_NAMESPACE", "svc_"),
        ]))
        .unwrap();

        assert!(!settings.enabled);
        assert_eq!(settings.namespace, "svc_");
        assert!(settings.warn_missing_primary_key);
    }

    #[test]
    fn test_from_lookup_empty_is_default() {
        assert_eq!(
            CacheSettings::from_lookup(lookup(&[])).unwrap(),
            CacheSettings::default()
        );
    }

    #[test]
    fn test_from_lookup_rejects_bad_bool() {
        let err = CacheSettings::from_lookup(lookup(&[("DBCACHE_ENABLED", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "DBCACHE_ENABLED"));
    }
}
