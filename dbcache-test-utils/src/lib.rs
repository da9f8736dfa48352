//! dbcache Test Utilities
//!
//! Shared test infrastructure for the dbcache workspace:
//! - A scripted query engine that records every call
//! - A cache store with injectable failures and a call log
//! - Proptest generators for descriptors and result sets
//! - Tracing setup for tests, and a layer capturing emitted events

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};

// Re-export core types for convenience
pub use dbcache_core::{
    CacheError, CacheKey, CacheSettings, DbCacheError, DbCacheResult, KeyDeriver, QueryDescriptor,
    QueryError, QueryResult, Row,
};
pub use dbcache_storage::{CacheStats, CacheStore, InMemoryCacheStore, QueryEngine};

use proptest::prelude::*;
use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

// ============================================================================
// TRACING
// ============================================================================

static TRACING: Once = Once::new();

/// Install a fmt subscriber writing through the test harness.
///
/// Honors `RUST_LOG`; defaults to `debug`. Safe to call from every test.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// One event seen by [`CapturedEvents`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
}

/// Layer recording the level and message of every event.
#[derive(Debug, Clone, Default)]
pub struct CapturedEvents {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedEvents {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of events at `level` whose message is exactly `message`.
    pub fn count(&self, level: Level, message: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.level == level && e.message == message)
            .count()
    }
}

impl<S: Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        if let Ok(mut events) = self.events.lock() {
            events.push(CapturedEvent {
                level: *event.metadata().level(),
                message: visitor.message,
            });
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

/// Run `f` with a thread-local subscriber capturing every event it emits.
pub fn capture_events<T>(f: impl FnOnce() -> T) -> (T, CapturedEvents) {
    let captured = CapturedEvents::default();
    let subscriber = tracing_subscriber::registry().with(captured.clone());
    let value = tracing::subscriber::with_default(subscriber, f);
    (value, captured)
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Build a row from a JSON object literal. Non-objects yield an empty row.
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

/// Two-row `users` result used across scenarios.
pub fn users_result() -> QueryResult {
    QueryResult::new(vec![
        row(serde_json::json!({"id": 1, "name": "ada"})),
        row(serde_json::json!({"id": 2, "name": "grace"})),
    ])
}

// ============================================================================
// CALL LOG
// ============================================================================

/// One observed call against a mock collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Select { table: String },
    Write { table: String },
    CacheRead { key: String },
    CacheWrite { key: String },
    CacheRemove { target: String, is_prefix: bool },
}

/// Ordered log shared between mocks, for asserting call order.
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<Call>>,
}

impl CallLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, call: Call) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

// ============================================================================
// MOCK QUERY ENGINE
// ============================================================================

/// Query engine answering from canned results keyed by table and predicates.
///
/// Unknown queries return an empty result. Every call is recorded.
#[derive(Debug, Default)]
pub struct MockQueryEngine {
    results: Mutex<HashMap<(String, String), QueryResult>>,
    failure: Mutex<Option<QueryError>>,
    selects: Mutex<Vec<QueryDescriptor>>,
    writes: Mutex<Vec<(QueryDescriptor, Row)>>,
    log: Option<Arc<CallLog>>,
}

impl MockQueryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record calls into a shared log as well.
    pub fn with_log(log: Arc<CallLog>) -> Self {
        Self {
            log: Some(log),
            ..Self::default()
        }
    }

    /// Answer selects on `table` with `predicates` with `result`.
    pub fn set_result(&self, table: &str, predicates: &str, result: QueryResult) {
        self.results
            .lock()
            .unwrap()
            .insert((table.to_string(), predicates.to_string()), result);
    }

    /// Fail every subsequent call with `error`.
    pub fn fail_with(&self, error: QueryError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    /// Stop failing.
    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn selects(&self) -> Vec<QueryDescriptor> {
        self.selects.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<(QueryDescriptor, Row)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn select_count(&self) -> usize {
        self.selects.lock().unwrap().len()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    fn failure(&self) -> Option<QueryError> {
        self.failure.lock().unwrap().clone()
    }
}

impl QueryEngine for MockQueryEngine {
    fn execute_select(&self, descriptor: &QueryDescriptor) -> Result<QueryResult, QueryError> {
        self.selects.lock().unwrap().push(descriptor.clone());
        if let Some(log) = &self.log {
            log.push(Call::Select {
                table: descriptor.table.clone(),
            });
        }
        if let Some(error) = self.failure() {
            return Err(error);
        }
        Ok(self
            .results
            .lock()
            .unwrap()
            .get(&(descriptor.table.clone(), descriptor.predicates.clone()))
            .cloned()
            .unwrap_or_default())
    }

    fn execute_write(&self, descriptor: &QueryDescriptor, values: &Row) -> Result<u64, QueryError> {
        self.writes
            .lock()
            .unwrap()
            .push((descriptor.clone(), values.clone()));
        if let Some(log) = &self.log {
            log.push(Call::Write {
                table: descriptor.table.clone(),
            });
        }
        match self.failure() {
            Some(error) => Err(error),
            None => Ok(1),
        }
    }
}

// ============================================================================
// MOCK CACHE STORE
// ============================================================================

/// In-memory cache store with switchable failures on each operation.
///
/// A failing operation returns [`CacheError::Backend`] without touching the
/// inner store; the other operations keep working.
#[derive(Debug, Default)]
pub struct MockCacheStore {
    inner: InMemoryCacheStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_removes: AtomicBool,
    log: Option<Arc<CallLog>>,
}

impl MockCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: Arc<CallLog>) -> Self {
        Self {
            log: Some(log),
            ..Self::default()
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    /// Fail every operation.
    pub fn fail_all(&self) {
        self.fail_reads(true);
        self.fail_writes(true);
        self.fail_removes(true);
    }

    /// The backing store, for inspecting contents without logging a call.
    pub fn inner(&self) -> &InMemoryCacheStore {
        &self.inner
    }

    fn record(&self, call: Call) {
        if let Some(log) = &self.log {
            log.push(call);
        }
    }
}

impl CacheStore for MockCacheStore {
    fn read(&self, key: &CacheKey) -> Result<QueryResult, CacheError> {
        self.record(Call::CacheRead {
            key: key.to_string(),
        });
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::backend("read refused"));
        }
        self.inner.read(key)
    }

    fn write(&self, key: &CacheKey, result: &QueryResult) -> Result<(), CacheError> {
        self.record(Call::CacheWrite {
            key: key.to_string(),
        });
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::backend("write refused"));
        }
        self.inner.write(key, result)
    }

    fn remove(&self, key_or_prefix: &str, is_prefix: bool) -> Result<u64, CacheError> {
        self.record(Call::CacheRemove {
            target: key_or_prefix.to_string(),
            is_prefix,
        });
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(CacheError::backend("remove refused"));
        }
        self.inner.remove(key_or_prefix, is_prefix)
    }

    fn stats(&self) -> CacheStats {
        self.inner.stats()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

/// Table names.
pub fn arb_table() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,11}"
}

/// Predicate strings in a small SQL-ish shape.
pub fn arb_predicates() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        ("[a-z]{1,8}", 0i64..10_000).prop_map(|(col, v)| format!("{col}={v}")),
        ("[a-z]{1,8}", "[a-z]{1,8}", 0i64..100)
            .prop_map(|(a, b, v)| format!("{a}={v} AND {b}>{v}")),
    ]
}

/// Column lists, possibly empty.
pub fn arb_columns() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z][a-z_]{0,9}", 0..5)
}

/// Cache group names, `None` about a third of the time.
pub fn arb_group() -> impl Strategy<Value = Option<String>> {
    prop::option::weighted(0.66, "[a-z]{1,8}")
}

/// Full query descriptors.
pub fn arb_descriptor() -> impl Strategy<Value = QueryDescriptor> {
    (arb_table(), arb_predicates(), arb_columns(), arb_group()).prop_map(
        |(table, predicates, columns, group)| QueryDescriptor {
            table,
            predicates,
            columns,
            group,
        },
    )
}

/// Result sets of up to eight `{id, name}` rows.
pub fn arb_query_result() -> impl Strategy<Value = QueryResult> {
    prop::collection::vec((any::<i64>(), "[a-zA-Z ]{0,16}"), 0..8).prop_map(|rows| {
        rows.into_iter()
            .map(|(id, name)| row(serde_json::json!({"id": id, "name": name})))
            .collect::<QueryResult>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_engine_canned_and_default() {
        let engine = MockQueryEngine::new();
        engine.set_result("users", "id=1", users_result());

        let hit = engine
            .execute_select(&QueryDescriptor::new("users").with_predicates("id=1"))
            .unwrap();
        assert_eq!(hit, users_result());

        let other = engine
            .execute_select(&QueryDescriptor::new("users").with_predicates("id=2"))
            .unwrap();
        assert!(other.is_empty());
        assert_eq!(engine.select_count(), 2);
    }

    #[test]
    fn test_mock_engine_failure_and_recover() {
        let engine = MockQueryEngine::new();
        engine.fail_with(QueryError::TableNotFound {
            table: "users".to_string(),
        });
        assert!(engine.execute_write(&QueryDescriptor::new("users"), &Row::new()).is_err());

        engine.recover();
        assert_eq!(engine.execute_write(&QueryDescriptor::new("users"), &Row::new()).unwrap(), 1);
        assert_eq!(engine.write_count(), 2);
    }

    #[test]
    fn test_mock_store_failures_leave_inner_untouched() {
        let store = MockCacheStore::new();
        let key = KeyDeriver::default().derive_key("users", "", &["id"], "");

        store.fail_writes(true);
        assert!(store.write(&key, &users_result()).is_err());
        assert!(store.inner().is_empty());

        store.fail_writes(false);
        store.write(&key, &users_result()).unwrap();
        store.fail_reads(true);
        let err = store.read(&key).unwrap_err();
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_call_log_orders_calls_across_mocks() {
        let log = CallLog::new();
        let engine = MockQueryEngine::with_log(log.clone());
        let store = MockCacheStore::with_log(log.clone());

        store.remove("database_usersrecent_", true).unwrap();
        engine.execute_write(&QueryDescriptor::new("users"), &Row::new()).unwrap();

        assert_eq!(
            log.calls(),
            vec![
                Call::CacheRemove {
                    target: "database_usersrecent_".to_string(),
                    is_prefix: true
                },
                Call::Write {
                    table: "users".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_capture_events_records_level_and_message() {
        let (_, captured) = capture_events(|| {
            tracing::warn!(table = "users", "Something odd");
            tracing::info!("Fine");
        });

        assert_eq!(captured.count(Level::WARN, "Something odd"), 1);
        assert_eq!(captured.count(Level::INFO, "Fine"), 1);
        assert_eq!(captured.events().len(), 2);
    }

    #[test]
    fn test_row_from_non_object_is_empty() {
        assert!(row(serde_json::json!([1, 2])).is_empty());
    }
}
