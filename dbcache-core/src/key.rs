//! Cache key derivation.
//!
//! Keys have the shape `{namespace}{table}{group}_{sha256-hex}`. The readable
//! prefix lets an operator see which table a key belongs to, and lets the
//! store drop a whole group with one prefix removal. The digest covers the
//! predicate string and the selected columns, in order.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::query::QueryDescriptor;

/// Namespace prepended to every key unless configured otherwise.
pub const DEFAULT_NAMESPACE: &str = "database_";

/// Separator between the readable prefix and the digest.
const SEPARATOR: char = '_';

/// A derived cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives cache keys from query shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDeriver {
    namespace: String,
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl KeyDeriver {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Derive the key for a query.
    ///
    /// Column order is significant: `[id, name]` and `[name, id]` cache
    /// independently. Each hashed component is length-prefixed, so moving a
    /// character across a column boundary changes the digest.
    pub fn derive_key<S: AsRef<str>>(
        &self,
        table: &str,
        predicates: &str,
        columns: &[S],
        group: &str,
    ) -> CacheKey {
        let mut hasher = Sha256::new();
        update_framed(&mut hasher, predicates.as_bytes());
        for column in columns {
            update_framed(&mut hasher, column.as_ref().as_bytes());
        }
        let digest = hex::encode(hasher.finalize());

        let mut key = self.group_prefix(table, group);
        key.push_str(&digest);
        CacheKey(key)
    }

    /// Derive the key for a descriptor.
    pub fn derive(&self, descriptor: &QueryDescriptor) -> CacheKey {
        self.derive_key(
            &descriptor.table,
            &descriptor.predicates,
            &descriptor.columns,
            descriptor.group_name(),
        )
    }

    /// The prefix shared by every key derived for `table` under `group`.
    ///
    /// Table and group are joined without a separator, so
    /// `("users", "recent")` yields the same prefix as the ungrouped keys of a
    /// table named `usersrecent`. Removing this prefix removes those too.
    pub fn group_prefix(&self, table: &str, group: &str) -> String {
        let mut prefix =
            String::with_capacity(self.namespace.len() + table.len() + group.len() + 1);
        prefix.push_str(&self.namespace);
        prefix.push_str(table);
        prefix.push_str(group);
        prefix.push(SEPARATOR);
        prefix
    }
}

fn update_framed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(predicates: &str, columns: &[&str], group: &str) -> CacheKey {
        KeyDeriver::default().derive_key("users", predicates, columns, group)
    }

    #[test]
    fn test_key_format() {
        let key = key("id=1", &["id", "name"], "");
        let s = key.as_str();

        assert!(s.starts_with("database_users_"));
        let digest = &s["database_users_".len()..];
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_group_in_prefix() {
        let key = key("id=1", &["id"], "recent");
        assert!(key.as_str().starts_with("database_usersrecent_"));
    }

    #[test]
    fn test_custom_namespace() {
        let deriver = KeyDeriver::new("app_");
        let key = deriver.derive_key("posts", "", &[] as &[&str], "");
        assert!(key.as_str().starts_with("app_posts_"));
        assert_eq!(deriver.namespace(), "app_");
    }

    #[test]
    fn test_column_order_matters() {
        assert_ne!(key("id=1", &["id", "name"], ""), key("id=1", &["name", "id"], ""));
    }

    #[test]
    fn test_column_boundaries_are_framed() {
        assert_ne!(key("", &["ab", "c"], ""), key("", &["a", "bc"], ""));
        assert_ne!(key("id", &["name"], ""), key("", &["id", "name"], ""));
    }

    #[test]
    fn test_derive_matches_derive_key() {
        let deriver = KeyDeriver::default();
        let descriptor = QueryDescriptor::new("users")
            .with_predicates("id=1")
            .with_columns(["id", "name"])
            .with_group("recent");

        assert_eq!(
            deriver.derive(&descriptor),
            deriver.derive_key("users", "id=1", &["id", "name"], "recent")
        );
    }

    #[test]
    fn test_group_prefix_is_unseparated_from_table() {
        let deriver = KeyDeriver::default();
        assert_eq!(
            deriver.group_prefix("users", "recent"),
            deriver.group_prefix("usersrecent", "")
        );
    }

    #[test]
    fn test_group_prefix_matches_derived_keys() {
        let deriver = KeyDeriver::default();
        let prefix = deriver.group_prefix("users", "recent");
        assert_eq!(prefix, "database_usersrecent_");
        assert!(deriver
            .derive_key("users", "id=7", &["id"], "recent")
            .as_str()
            .starts_with(&prefix));
        assert!(!deriver
            .derive_key("users", "id=7", &["id"], "")
            .as_str()
            .starts_with(&prefix));
    }
}
