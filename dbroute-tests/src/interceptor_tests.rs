//! Operations bracketed by `DbRouter`, as a data-access layer would use it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dbroute_core::{DbIndex, RouterConfig, TbIndex};
use dbroute_routing::{context, DbRouter, RoutingError, RoutingStrategy, Shard};
use thiserror::Error;

/// Errors raised by the in-memory store below.
#[derive(Debug, Error, PartialEq, Eq)]
enum StoreError {
    #[error("no routing decision")]
    Unrouted,
    #[error("row {0} not found")]
    NotFound(String),
}

/// Physical tables keyed by `"<db>.<table>_<tb>"`, filled through the
/// routing context the way a DAO picks its connection and table name.
#[derive(Debug, Default)]
struct ShardedStore {
    tables: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl ShardedStore {
    fn table_name() -> Result<String, StoreError> {
        let db = context::db_key().ok_or(StoreError::Unrouted)?;
        let tb = context::tb_key().ok_or(StoreError::Unrouted)?;
        Ok(format!("{db}.user_{tb}"))
    }

    fn insert(&self, id: &str, value: &str) -> Result<String, StoreError> {
        let table = Self::table_name()?;
        self.tables
            .lock()
            .unwrap()
            .entry(table.clone())
            .or_default()
            .insert(id.to_string(), value.to_string());
        Ok(table)
    }

    fn get(&self, id: &str) -> Result<String, StoreError> {
        let table = Self::table_name()?;
        self.tables
            .lock()
            .unwrap()
            .get(&table)
            .and_then(|rows| rows.get(id).cloned())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn table_count(&self) -> usize {
        self.tables.lock().unwrap().len()
    }
}

fn create_test_router() -> DbRouter {
    let strategy = RoutingStrategy::new(RouterConfig::new(2, 4)).unwrap();
    DbRouter::new(Arc::new(strategy))
}

#[tokio::test]
async fn test_interceptor_insert_then_get() {
    let router = create_test_router();
    let store = &ShardedStore::default();

    for i in 0..200 {
        let id = &format!("user:{i}");
        router
            .route_scoped(id, |_| async move { store.insert(id, "alice") })
            .await
            .unwrap()
            .unwrap();
    }

    for i in 0..200 {
        let id = &format!("user:{i}");
        let value = router
            .route_scoped(id, |_| async move { store.get(id) })
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Ok("alice"));
    }

    // 200 ids spread over all eight physical tables.
    assert_eq!(store.table_count(), 8);
}

#[tokio::test]
async fn test_interceptor_store_error_propagates_and_releases() {
    let router = create_test_router();
    let store = &ShardedStore::default();

    let result = router
        .route_scoped("user:missing", |_| async move { store.get("user:missing") })
        .await
        .unwrap();

    assert_eq!(result, Err(StoreError::NotFound("user:missing".to_string())));
    assert!(!context::in_scope());
}

#[tokio::test]
async fn test_interceptor_unrouted_access_is_absent() {
    let store = &ShardedStore::default();

    // Without a router the store sees no decision and must decide itself.
    let result = context::scope(async { store.get("user:1") }).await;
    assert_eq!(result, Err(StoreError::Unrouted));
}

#[tokio::test]
async fn test_interceptor_target_matches_hash_routing() {
    let router = create_test_router();
    let store = &ShardedStore::default();
    let shard = router.strategy().resolve("user:42").unwrap();

    router
        .target_scoped(shard, |_| async move { store.insert("user:42", "bob") })
        .await
        .unwrap()
        .unwrap();

    let value = router
        .route_scoped("user:42", |_| async move { store.get("user:42") })
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Ok("bob"));
}

#[tokio::test]
async fn test_interceptor_scatter_counts_rows() {
    let router = create_test_router();
    let store = &ShardedStore::default();

    for i in 0..100 {
        let id = &format!("user:{i}");
        router
            .route_scoped(id, |_| async move { store.insert(id, "x") })
            .await
            .unwrap()
            .unwrap();
    }

    let counts = router
        .scatter(|_| async move {
            let table = ShardedStore::table_name().unwrap();
            store
                .tables
                .lock()
                .unwrap()
                .get(&table)
                .map_or(0, HashMap::len)
        })
        .await
        .unwrap();

    assert_eq!(counts.len(), 8);
    assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 100);
}

#[tokio::test]
async fn test_interceptor_out_of_range_target() {
    let router = create_test_router();
    let target = Shard::new(DbIndex::new(0), TbIndex::new(4));

    let result = router.target_scoped(target, |_| async {}).await;
    assert!(matches!(
        result,
        Err(RoutingError::IndexOutOfRange { kind: "tb", .. })
    ));
}

#[tokio::test]
async fn test_interceptor_data_source_visible_to_routed_calls() {
    let router = &create_test_router();
    let expected = router.strategy().resolve("user:7").unwrap();

    // A data source chosen for the whole service, routed calls inside it.
    let (source, shard, db, cleared, after_clear) = router
        .with_data_source("archive", || async move {
            router
                .route_scoped("user:7", |shard| async move {
                    let source = context::data_source();
                    let db = context::db_key();
                    router.strategy().clear();
                    (source, shard, db, context::current_shard(), context::data_source())
                })
                .await
                .unwrap()
        })
        .await
        .unwrap();

    assert_eq!(source.as_deref(), Some("archive"));
    assert_eq!(shard, expected);
    assert_eq!(db, Some(expected.db().padded()));
    // Clearing the routing decision keeps the data source.
    assert_eq!(cleared, None);
    assert_eq!(after_clear.as_deref(), Some("archive"));
    assert!(!context::in_scope());
}

#[tokio::test]
async fn test_interceptor_data_source_per_call() {
    let router = &create_test_router();
    let store = &ShardedStore::default();

    let (source, table) = router
        .with_data_source("archive", || async move {
            let table = router
                .route_scoped("user:1", |_| async move { store.insert("user:1", "x") })
                .await
                .unwrap()
                .unwrap();
            (context::data_source(), table)
        })
        .await
        .unwrap();
    assert_eq!(source.as_deref(), Some("archive"));
    assert!(table.contains(".user_"));

    // A later call without the override does not see it.
    let source = router
        .route_scoped("user:1", |_| async { context::data_source() })
        .await
        .unwrap();
    assert_eq!(source, None);
}

#[tokio::test]
async fn test_interceptor_scatter_follows_ring() {
    let mut strategy = RoutingStrategy::new(RouterConfig::new(2, 4)).unwrap();
    let removed = strategy.remove_node("1_1").unwrap();
    let router = DbRouter::new(Arc::new(strategy));

    let visited = router
        .scatter(|shard| async move { shard })
        .await
        .unwrap();

    assert_eq!(visited.len(), 7);
    assert!(visited.iter().all(|(shard, _)| *shard != removed));
}
