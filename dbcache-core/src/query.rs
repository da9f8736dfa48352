//! Query descriptors and result sets

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single result row, keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// Anything that can be rendered into its canonical predicate string.
///
/// The rendering must be deterministic: the string is hashed into the cache
/// key, so two renderings of the same filter must be byte-identical.
pub trait Predicates {
    fn convert(&self) -> String;
}

impl Predicates for str {
    fn convert(&self) -> String {
        self.to_string()
    }
}

impl Predicates for String {
    fn convert(&self) -> String {
        self.clone()
    }
}

impl<T: Predicates + ?Sized> Predicates for &T {
    fn convert(&self) -> String {
        (**self).convert()
    }
}

impl<T: Predicates> Predicates for Option<T> {
    fn convert(&self) -> String {
        self.as_ref().map(Predicates::convert).unwrap_or_default()
    }
}

/// Logical shape of one query, built per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    /// Table the query runs against.
    pub table: String,
    /// Serialized predicate expression.
    pub predicates: String,
    /// Selected columns, in projection order.
    pub columns: Vec<String>,
    /// Cache group this query belongs to, if any.
    pub group: Option<String>,
}

impl QueryDescriptor {
    /// Create a descriptor selecting nothing, with no predicates.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: String::new(),
            columns: Vec::new(),
            group: None,
        }
    }

    /// Set the predicate expression.
    pub fn with_predicates<P: Predicates + ?Sized>(mut self, predicates: &P) -> Self {
        self.predicates = predicates.convert();
        self
    }

    /// Set the selected columns.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the cache group. Empty names mean "no group".
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        let group = group.into();
        self.group = if group.is_empty() { None } else { Some(group) };
        self
    }

    /// The group name, or `""` when ungrouped.
    pub fn group_name(&self) -> &str {
        self.group.as_deref().unwrap_or("")
    }
}

/// Rows returned by a select, in engine order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    rows: Vec<Row>,
}

impl QueryResult {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<Row>> for QueryResult {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

impl FromIterator<Row> for QueryResult {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    #[test]
    fn test_descriptor_builder() {
        let descriptor = QueryDescriptor::new("users")
            .with_predicates("id=1")
            .with_columns(["id", "name"])
            .with_group("recent");

        assert_eq!(descriptor.table, "users");
        assert_eq!(descriptor.predicates, "id=1");
        assert_eq!(descriptor.columns, vec!["id".to_string(), "name".to_string()]);
        assert_eq!(descriptor.group_name(), "recent");
    }

    #[test]
    fn test_empty_group_is_no_group() {
        let descriptor = QueryDescriptor::new("users").with_group("");
        assert_eq!(descriptor.group, None);
        assert_eq!(descriptor.group_name(), "");
    }

    #[test]
    fn test_predicates_convert() {
        assert_eq!("a=1".convert(), "a=1");
        assert_eq!(String::from("b=2").convert(), "b=2");
        assert_eq!(Some("c=3").convert(), "c=3");
        assert_eq!(None::<String>.convert(), "");
    }

    #[test]
    fn test_query_result_accessors() {
        let result: QueryResult = vec![
            row(json!({"id": 1, "name": "ada"})),
            row(json!({"id": 2, "name": "grace"})),
        ]
        .into();

        assert_eq!(result.len(), 2);
        assert!(!result.is_empty());
        assert_eq!(result.first().and_then(|r| r.get("name")), Some(&json!("ada")));
        assert!(QueryResult::empty().is_empty());
    }

    #[test]
    fn test_query_result_json_preserves_row_order() {
        let result: QueryResult = (1..=3).map(|i| row(json!({ "id": i }))).collect();
        let bytes = serde_json::to_vec(&result).unwrap();
        let back: QueryResult = serde_json::from_slice(&bytes).unwrap();
        let ids: Vec<_> = back.rows().iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
    }
}
