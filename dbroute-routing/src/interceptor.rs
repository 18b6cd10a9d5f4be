//! Interception hook around sharded operations.
//!
//! [`DbRouter`] is the middleware that brackets a data-access call: it opens
//! a routing scope, writes the routing decision, runs the operation, and
//! drops the decision when the scope ends. Because the decision lives in
//! the scope, it is released on every exit path, including errors returned
//! by the operation, panics, and cancellation of the returned future.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use dbroute_core::RouterConfig;
//! use dbroute_routing::{context, DbRouter, RoutingStrategy};
//!
//! let strategy = RoutingStrategy::new(RouterConfig::new(2, 4)).unwrap();
//! let router = DbRouter::new(Arc::new(strategy));
//!
//! let table = router
//!     .route_blocking("user:1001", |shard| {
//!         // The data-access layer reads the decision from the context.
//!         let db = context::db_key().unwrap();
//!         let tb = context::tb_key().unwrap();
//!         assert_eq!(db, shard.db().padded());
//!         format!("user_{tb}")
//!     })
//!     .unwrap();
//!
//! assert!(table.starts_with("user_00"));
//! assert_eq!(context::db_key(), None);
//! ```

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::context;
use crate::error::{Result, RoutingError};
use crate::key::RoutingKey;
use crate::shard::Shard;
use crate::strategy::RoutingStrategy;

/// Brackets operations with a routing decision.
#[derive(Debug, Clone)]
pub struct DbRouter {
    strategy: Arc<RoutingStrategy>,
}

impl DbRouter {
    /// Creates a router over a shared strategy.
    #[must_use]
    pub const fn new(strategy: Arc<RoutingStrategy>) -> Self {
        Self { strategy }
    }

    /// Returns the strategy.
    #[must_use]
    pub fn strategy(&self) -> &RoutingStrategy {
        &self.strategy
    }

    /// Routes `key`, then runs `op` with the decision bound to the call.
    ///
    /// # Errors
    ///
    /// Returns a routing error if the key cannot be routed; `op` is not run.
    pub async fn route_scoped<K, F, Fut>(&self, key: &K, op: F) -> Result<Fut::Output>
    where
        K: RoutingKey + ?Sized,
        F: FnOnce(Shard) -> Fut,
        Fut: Future,
    {
        context::scope(async {
            let shard = self.strategy.route(key)?;
            Ok::<_, RoutingError>(op(shard).await)
        })
        .await
    }

    /// Runs `op` against an explicitly chosen shard, bypassing hashing.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::IndexOutOfRange` if the shard is outside the
    /// configured counts; `op` is not run.
    pub async fn target_scoped<F, Fut>(&self, shard: Shard, op: F) -> Result<Fut::Output>
    where
        F: FnOnce(Shard) -> Fut,
        Fut: Future,
    {
        context::scope(async {
            self.strategy.set_db_index(shard.db().get())?;
            self.strategy.set_tb_index(shard.tb().get())?;
            Ok::<_, RoutingError>(op(shard).await)
        })
        .await
    }

    /// Runs `op` with a named data source bound to the call.
    ///
    /// Calls routed inside `op` (through [`DbRouter::route_scoped`] and the
    /// like) see the data source alongside their own indices.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::BlankDataSource` if `name` is blank; `op` is
    /// not run.
    pub async fn with_data_source<F, Fut>(&self, name: &str, op: F) -> Result<Fut::Output>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        if name.trim().is_empty() {
            return Err(RoutingError::BlankDataSource);
        }
        context::scope(async {
            context::with_current(|ctx| ctx.set_data_source(name))?;
            debug!(data_source = name, "selected data source");
            Ok::<_, RoutingError>(op().await)
        })
        .await
    }

    /// Runs `op` once per shard on the ring, in `(db, tb)` order, each in
    /// its own scope. Collects every result.
    ///
    /// # Errors
    ///
    /// Returns the first routing error; results gathered so far are dropped.
    pub async fn scatter<F, Fut>(&self, mut op: F) -> Result<Vec<(Shard, Fut::Output)>>
    where
        F: FnMut(Shard) -> Fut,
        Fut: Future,
    {
        let mut results = Vec::with_capacity(self.strategy.shard_count());
        for shard in self.strategy.shards() {
            let output = self.target_scoped(shard, &mut op).await?;
            results.push((shard, output));
        }
        Ok(results)
    }

    /// Blocking variant of [`DbRouter::route_scoped`].
    ///
    /// # Errors
    ///
    /// Returns a routing error if the key cannot be routed; `op` is not run.
    pub fn route_blocking<K, F, T>(&self, key: &K, op: F) -> Result<T>
    where
        K: RoutingKey + ?Sized,
        F: FnOnce(Shard) -> T,
    {
        context::sync_scope(|| {
            let shard = self.strategy.route(key)?;
            Ok(op(shard))
        })
    }

    /// Blocking variant of [`DbRouter::target_scoped`].
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::IndexOutOfRange` if the shard is outside the
    /// configured counts; `op` is not run.
    pub fn target_blocking<F, T>(&self, shard: Shard, op: F) -> Result<T>
    where
        F: FnOnce(Shard) -> T,
    {
        context::sync_scope(|| {
            self.strategy.set_db_index(shard.db().get())?;
            self.strategy.set_tb_index(shard.tb().get())?;
            Ok(op(shard))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use dbroute_core::{DbIndex, RouterConfig, TbIndex};

    use super::*;

    fn create_test_router() -> DbRouter {
        let strategy = RoutingStrategy::new(RouterConfig::new(2, 4)).unwrap();
        DbRouter::new(Arc::new(strategy))
    }

    #[tokio::test]
    async fn test_route_scoped_binds_decision() {
        let router = create_test_router();
        let expected = router.strategy().resolve("user:1001").unwrap();

        let seen = router
            .route_scoped("user:1001", |shard| async move {
                assert_eq!(shard, expected);
                tokio::task::yield_now().await;
                context::current_shard()
            })
            .await
            .unwrap();

        assert_eq!(seen, Some(expected));
        assert!(!context::in_scope());
    }

    #[tokio::test]
    async fn test_target_scoped() {
        let router = create_test_router();
        let target = Shard::new(DbIndex::new(1), TbIndex::new(2));

        let keys = router
            .target_scoped(target, |_| async { (context::db_key(), context::tb_key()) })
            .await
            .unwrap();

        assert_eq!(keys, (Some("01".to_string()), Some("002".to_string())));
    }

    #[tokio::test]
    async fn test_target_scoped_out_of_range_skips_op() {
        let router = create_test_router();
        let target = Shard::new(DbIndex::new(5), TbIndex::new(0));

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let result = router
            .target_scoped(target, move |_| async move { flag.store(true, Ordering::SeqCst) })
            .await;

        assert!(matches!(result, Err(RoutingError::IndexOutOfRange { .. })));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_with_data_source() {
        let router = create_test_router();

        let seen = router
            .with_data_source("archive", || async { context::data_source() })
            .await
            .unwrap();
        assert_eq!(seen.as_deref(), Some("archive"));

        let result = router.with_data_source("  ", || async {}).await;
        assert!(matches!(result, Err(RoutingError::BlankDataSource)));
    }

    #[tokio::test]
    async fn test_route_inside_data_source() {
        let router = &create_test_router();

        let (source, db) = router
            .with_data_source("archive", || async move {
                router
                    .route_scoped("user:7", |_| async {
                        (context::data_source(), context::db_key())
                    })
                    .await
                    .unwrap()
            })
            .await
            .unwrap();

        assert_eq!(source.as_deref(), Some("archive"));
        assert!(db.is_some());
    }

    #[tokio::test]
    async fn test_scatter_visits_every_shard() {
        let router = create_test_router();

        let results = router
            .scatter(|shard| async move {
                assert_eq!(context::current_shard(), Some(shard));
                format!("{}.{}", context::db_key().unwrap(), context::tb_key().unwrap())
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 8);
        assert_eq!(results[0].1, "00.000");
        assert_eq!(results[7].1, "01.003");
    }

    #[test]
    fn test_route_blocking_releases_on_error() {
        let router = create_test_router();

        let result: Result<std::result::Result<(), &str>> =
            router.route_blocking("user:1", |_| Err("query failed"));

        assert_eq!(result.unwrap(), Err("query failed"));
        assert!(!context::in_scope());
    }

    #[test]
    fn test_target_blocking() {
        let router = create_test_router();
        let target = Shard::new(DbIndex::new(0), TbIndex::new(3));

        let tb = router.target_blocking(target, |_| context::tb_key()).unwrap();
        assert_eq!(tb.as_deref(), Some("003"));
    }
}
