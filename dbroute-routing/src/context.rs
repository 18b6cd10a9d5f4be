//! Call-scoped routing context.
//!
//! A [`RoutingContext`] holds the routing decision for one logical call:
//! the resolved database and table indices, plus an optional named data
//! source. It is a plain value and can be threaded through a call chain
//! explicitly.
//!
//! For callers that cannot thread it, the context can also be bound to the
//! running call with [`scope`] (async) or [`sync_scope`] (blocking). The
//! binding is a tokio task-local, so concurrent calls never see each
//! other's decision, and the context is dropped when the scope ends: on
//! return, on error, on panic, and when the scoped future is dropped before
//! completion.
//!
//! Nested scopes shadow the outer one until they end. A nested scope starts
//! with no indices but inherits the enclosing data source, so a data source
//! chosen for a whole service stays visible to the routed calls inside it.
//!
//! # Example
//!
//! ```
//! use dbroute_routing::context::{self, RoutingContext};
//! use dbroute_core::{DbIndex, TbIndex};
//!
//! let (db, tb) = context::sync_scope(|| {
//!     context::with_current(|ctx| {
//!         ctx.set_db_index(DbIndex::new(1));
//!         ctx.set_tb_index(TbIndex::new(2));
//!     })
//!     .unwrap();
//!     (context::db_key(), context::tb_key())
//! });
//!
//! assert_eq!(db.as_deref(), Some("01"));
//! assert_eq!(tb.as_deref(), Some("002"));
//!
//! // Outside the scope nothing is visible.
//! assert_eq!(context::db_key(), None);
//! ```

use std::cell::RefCell;
use std::future::Future;

use dbroute_core::{DbIndex, TbIndex};

use crate::error::{Result, RoutingError};
use crate::shard::Shard;

tokio::task_local! {
    static CURRENT: RefCell<RoutingContext>;
}

/// Routing decision for one logical call.
///
/// Reading before any write returns `None`: there is no implicit default
/// shard. Whether "absent" is fatal or falls back to a default shard is up
/// to the data-access layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingContext {
    db: Option<DbIndex>,
    tb: Option<TbIndex>,
    data_source: Option<String>,
}

impl RoutingContext {
    /// Creates an empty context.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            db: None,
            tb: None,
            data_source: None,
        }
    }

    /// Sets the database index.
    pub fn set_db_index(&mut self, db: DbIndex) {
        self.db = Some(db);
    }

    /// Sets the table index.
    pub fn set_tb_index(&mut self, tb: TbIndex) {
        self.tb = Some(tb);
    }

    /// Sets both indices from a shard.
    pub fn set_shard(&mut self, shard: Shard) {
        self.db = Some(shard.db());
        self.tb = Some(shard.tb());
    }

    /// Sets the named data source override.
    pub fn set_data_source(&mut self, name: impl Into<String>) {
        self.data_source = Some(name.into());
    }

    /// Returns the database index, if set.
    #[must_use]
    pub const fn db_index(&self) -> Option<DbIndex> {
        self.db
    }

    /// Returns the table index, if set.
    #[must_use]
    pub const fn tb_index(&self) -> Option<TbIndex> {
        self.tb
    }

    /// Returns the database index zero-padded to 2 digits, if set.
    #[must_use]
    pub fn db_key(&self) -> Option<String> {
        self.db.map(DbIndex::padded)
    }

    /// Returns the table index zero-padded to 3 digits, if set.
    #[must_use]
    pub fn tb_key(&self) -> Option<String> {
        self.tb.map(TbIndex::padded)
    }

    /// Returns the shard, if both indices are set.
    #[must_use]
    pub fn shard(&self) -> Option<Shard> {
        Some(Shard::new(self.db?, self.tb?))
    }

    /// Returns the named data source override, if set.
    #[must_use]
    pub fn data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }

    /// Returns true if nothing has been written.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.db.is_none() && self.tb.is_none() && self.data_source.is_none()
    }

    /// Clears the db and tb indices, keeping the data source.
    pub fn clear_indices(&mut self) {
        self.db = None;
        self.tb = None;
    }

    /// Clears everything. Clearing an empty context is a no-op.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Returns the context a nested call starts from: no indices, same
    /// data source.
    #[must_use]
    pub fn nested(&self) -> Self {
        Self {
            db: None,
            tb: None,
            data_source: self.data_source.clone(),
        }
    }
}

fn enclosing_nested() -> RoutingContext {
    CURRENT
        .try_with(|cell| cell.borrow().nested())
        .unwrap_or_default()
}

/// Runs `future` with a fresh context bound to it.
///
/// The context has no indices and inherits the data source of the scope
/// active when `scope` is called, if any. It lives exactly as long as the
/// returned future.
pub fn scope<F: Future>(future: F) -> impl Future<Output = F::Output> {
    scope_with(enclosing_nested(), future)
}

/// Runs `future` with `ctx` bound to it.
pub fn scope_with<F: Future>(ctx: RoutingContext, future: F) -> impl Future<Output = F::Output> {
    CURRENT.scope(RefCell::new(ctx), future)
}

/// Runs `f` with a fresh context bound to the current thread for the
/// duration of the call.
///
/// The context has no indices and inherits the enclosing data source.
pub fn sync_scope<R>(f: impl FnOnce() -> R) -> R {
    sync_scope_with(enclosing_nested(), f)
}

/// Runs `f` with `ctx` bound to the current thread for the duration of
/// the call.
pub fn sync_scope_with<R>(ctx: RoutingContext, f: impl FnOnce() -> R) -> R {
    CURRENT.sync_scope(RefCell::new(ctx), f)
}

/// Returns true if a routing scope is active.
#[must_use]
pub fn in_scope() -> bool {
    CURRENT.try_with(|_| ()).is_ok()
}

/// Mutates the bound context.
///
/// `f` must not call back into this module's accessors.
///
/// # Errors
///
/// Returns `RoutingError::NoActiveContext` outside any scope.
pub fn with_current<R>(f: impl FnOnce(&mut RoutingContext) -> R) -> Result<R> {
    CURRENT
        .try_with(|cell| f(&mut cell.borrow_mut()))
        .map_err(|_| RoutingError::NoActiveContext)
}

/// Returns a snapshot of the bound context, or `None` outside any scope.
#[must_use]
pub fn current() -> Option<RoutingContext> {
    CURRENT.try_with(|cell| cell.borrow().clone()).ok()
}

/// Returns the bound database index zero-padded, if any.
#[must_use]
pub fn db_key() -> Option<String> {
    CURRENT.try_with(|cell| cell.borrow().db_key()).ok().flatten()
}

/// Returns the bound table index zero-padded, if any.
#[must_use]
pub fn tb_key() -> Option<String> {
    CURRENT.try_with(|cell| cell.borrow().tb_key()).ok().flatten()
}

/// Returns the bound shard, if both indices are set.
#[must_use]
pub fn current_shard() -> Option<Shard> {
    CURRENT.try_with(|cell| cell.borrow().shard()).ok().flatten()
}

/// Returns the bound data source override, if any.
#[must_use]
pub fn data_source() -> Option<String> {
    CURRENT
        .try_with(|cell| cell.borrow().data_source().map(str::to_owned))
        .ok()
        .flatten()
}

/// Clears the bound db and tb indices. The data source stays until its
/// scope ends. A no-op outside any scope.
pub fn clear() {
    let _ = CURRENT.try_with(|cell| cell.borrow_mut().clear_indices());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context() {
        let ctx = RoutingContext::new();

        assert!(ctx.is_empty());
        assert_eq!(ctx.db_key(), None);
        assert_eq!(ctx.tb_key(), None);
        assert_eq!(ctx.shard(), None);
        assert_eq!(ctx.data_source(), None);
    }

    #[test]
    fn test_padded_keys() {
        let mut ctx = RoutingContext::new();
        ctx.set_db_index(DbIndex::new(1));
        ctx.set_tb_index(TbIndex::new(2));

        assert_eq!(ctx.db_key().as_deref(), Some("01"));
        assert_eq!(ctx.tb_key().as_deref(), Some("002"));
        assert_eq!(ctx.shard(), Some(Shard::new(DbIndex::new(1), TbIndex::new(2))));
    }

    #[test]
    fn test_partial_decision_has_no_shard() {
        let mut ctx = RoutingContext::new();
        ctx.set_db_index(DbIndex::new(3));

        assert_eq!(ctx.db_key().as_deref(), Some("03"));
        assert_eq!(ctx.shard(), None);
        assert!(!ctx.is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut ctx = RoutingContext::new();
        ctx.clear();
        assert!(ctx.is_empty());

        ctx.set_shard(Shard::new(DbIndex::new(0), TbIndex::new(5)));
        ctx.set_data_source("orders");
        ctx.clear();
        ctx.clear();
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_outside_scope() {
        assert!(!in_scope());
        assert_eq!(current(), None);
        assert_eq!(db_key(), None);
        assert!(matches!(
            with_current(|ctx| ctx.set_db_index(DbIndex::new(1))),
            Err(RoutingError::NoActiveContext)
        ));
        // Clearing outside a scope is a no-op.
        clear();
    }

    #[test]
    fn test_sync_scope_binds_and_releases() {
        let seen = sync_scope(|| {
            assert!(in_scope());
            assert_eq!(current(), Some(RoutingContext::new()));

            with_current(|ctx| ctx.set_tb_index(TbIndex::new(7))).unwrap();
            tb_key()
        });

        assert_eq!(seen.as_deref(), Some("007"));
        assert!(!in_scope());
    }

    #[test]
    fn test_nested_scope_shadows_outer() {
        sync_scope(|| {
            with_current(|ctx| ctx.set_db_index(DbIndex::new(1))).unwrap();

            sync_scope(|| {
                assert_eq!(db_key(), None);
                with_current(|ctx| ctx.set_db_index(DbIndex::new(2))).unwrap();
                assert_eq!(db_key().as_deref(), Some("02"));
            });

            assert_eq!(db_key().as_deref(), Some("01"));
        });
    }

    #[test]
    fn test_clear_in_scope() {
        sync_scope(|| {
            with_current(|ctx| {
                ctx.set_shard(Shard::new(DbIndex::new(1), TbIndex::new(1)));
                ctx.set_data_source("archive");
            })
            .unwrap();
            assert_eq!(data_source().as_deref(), Some("archive"));

            clear();
            clear();
            assert_eq!(current_shard(), None);
            assert_eq!(data_source().as_deref(), Some("archive"));
        });
    }

    #[test]
    fn test_nested_scope_inherits_data_source() {
        sync_scope(|| {
            with_current(|ctx| {
                ctx.set_data_source("archive");
                ctx.set_shard(Shard::new(DbIndex::new(1), TbIndex::new(1)));
            })
            .unwrap();

            let (inner_source, inner_shard) = sync_scope(|| {
                with_current(|ctx| ctx.set_data_source("reports")).unwrap();
                (data_source(), current_shard())
            });
            assert_eq!(inner_source.as_deref(), Some("reports"));
            assert_eq!(inner_shard, None);

            // The inner override ended with its scope.
            assert_eq!(data_source().as_deref(), Some("archive"));
        });
    }

    #[test]
    fn test_scope_with_explicit_context() {
        let mut ctx = RoutingContext::new();
        ctx.set_shard(Shard::new(DbIndex::new(2), TbIndex::new(5)));

        let keys = sync_scope_with(ctx, || (db_key(), tb_key()));
        assert_eq!(keys, (Some("02".to_string()), Some("005".to_string())));
    }

    #[test]
    fn test_clear_indices_keeps_data_source() {
        let mut ctx = RoutingContext::new();
        ctx.set_shard(Shard::new(DbIndex::new(0), TbIndex::new(1)));
        ctx.set_data_source("archive");

        let nested = ctx.nested();
        assert_eq!(nested.shard(), None);
        assert_eq!(nested.data_source(), Some("archive"));

        ctx.clear_indices();
        assert_eq!(ctx, nested);
    }

    #[tokio::test]
    async fn test_async_scope() {
        let shard = scope(async {
            with_current(|ctx| ctx.set_shard(Shard::new(DbIndex::new(4), TbIndex::new(9))))
                .unwrap();
            tokio::task::yield_now().await;
            current_shard()
        })
        .await;

        assert_eq!(shard, Some(Shard::new(DbIndex::new(4), TbIndex::new(9))));
        assert!(!in_scope());
    }

    #[tokio::test]
    async fn test_async_nested_scope_inherits_data_source() {
        scope(async {
            with_current(|ctx| ctx.set_data_source("archive")).unwrap();

            let inner = scope(async {
                tokio::task::yield_now().await;
                data_source()
            })
            .await;
            assert_eq!(inner.as_deref(), Some("archive"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_spawned_task_does_not_inherit() {
        scope(async {
            with_current(|ctx| ctx.set_db_index(DbIndex::new(1))).unwrap();

            let inner = tokio::spawn(async { db_key() }).await.unwrap();
            assert_eq!(inner, None);
            assert_eq!(db_key().as_deref(), Some("01"));
        })
        .await;
    }
}
