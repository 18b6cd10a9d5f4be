//! Consistent-hash routing strategy.
//!
//! The strategy is built once from configuration and shared by every call.
//! Routing reads the ring and writes the decision into the call's
//! [`RoutingContext`]; it never mutates the ring, so any number of calls
//! may route concurrently through a shared `&RoutingStrategy`.
//!
//! Ring administration ([`RoutingStrategy::add_node`],
//! [`RoutingStrategy::remove_node`]) needs exclusive access and only admits
//! shards inside the configured `db_count x tb_count` grid, so every routed
//! shard is one `set_db_index`/`set_tb_index` would also accept. Callers
//! that mutate the ring while serving traffic must wrap the strategy in a
//! lock (or swap in a new strategy) themselves.

use dbroute_core::{DbIndex, RouterConfig, TbIndex};
use tracing::{debug, info, trace};

use crate::context::{self, RoutingContext};
use crate::error::{Result, RoutingError};
use crate::key::RoutingKey;
use crate::ring::HashRing;
use crate::shard::Shard;

/// Routes keys to `(database, table)` shards with a consistent-hash ring.
#[derive(Debug, Clone)]
pub struct RoutingStrategy {
    /// Configuration the ring was built from.
    config: RouterConfig,
    /// The ring.
    ring: HashRing,
}

impl RoutingStrategy {
    /// Creates a strategy and builds its ring.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::Config` if the configuration is invalid; a
    /// strategy is never built over an empty ring.
    pub fn new(config: RouterConfig) -> Result<Self> {
        let ring = HashRing::from_config(&config)?;
        Ok(Self { config, ring })
    }

    /// Resolves a key to its shard without touching any context.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::EmptyRing` if every shard was removed.
    pub fn resolve<K: RoutingKey + ?Sized>(&self, key: &K) -> Result<Shard> {
        self.ring.resolve(key)
    }

    /// Routes a key and writes the decision into the bound context.
    ///
    /// Returns the shard as well, for callers that don't read the context.
    ///
    /// The context is never created implicitly: a decision written outside
    /// [`context::scope`] or [`context::sync_scope`] would have no owner to
    /// drop it when the call ends, and would outlive the call. Outside a
    /// scope, route with [`RoutingStrategy::route_into`] and thread the
    /// context explicitly, or go through [`crate::DbRouter`].
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::NoActiveContext` outside a routing scope, or
    /// `RoutingError::EmptyRing` if every shard was removed.
    pub fn route<K: RoutingKey + ?Sized>(&self, key: &K) -> Result<Shard> {
        let shard = self.resolve(key)?;
        context::with_current(|ctx| ctx.set_shard(shard))?;
        debug!(db = %shard.db(), tb = %shard.tb(), "routed key");
        Ok(shard)
    }

    /// Routes a key and writes the decision into an explicit context.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::EmptyRing` if every shard was removed.
    pub fn route_into<K: RoutingKey + ?Sized>(
        &self,
        key: &K,
        ctx: &mut RoutingContext,
    ) -> Result<Shard> {
        let shard = self.resolve(key)?;
        ctx.set_shard(shard);
        debug!(db = %shard.db(), tb = %shard.tb(), "routed key");
        Ok(shard)
    }

    /// Sets the database index of the bound context, bypassing hashing.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::IndexOutOfRange` if `db >= db_count`, or
    /// `RoutingError::NoActiveContext` outside a routing scope.
    pub fn set_db_index(&self, db: u32) -> Result<()> {
        let db = self.check_db(db)?;
        context::with_current(|ctx| ctx.set_db_index(db))?;
        trace!(db = %db, "set db index");
        Ok(())
    }

    /// Sets the table index of the bound context, bypassing hashing.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::IndexOutOfRange` if `tb >= tb_count`, or
    /// `RoutingError::NoActiveContext` outside a routing scope.
    pub fn set_tb_index(&self, tb: u32) -> Result<()> {
        let tb = self.check_tb(tb)?;
        context::with_current(|ctx| ctx.set_tb_index(tb))?;
        trace!(tb = %tb, "set tb index");
        Ok(())
    }

    /// Checks that a shard is within the configured counts.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::IndexOutOfRange` for the first index that is not.
    pub fn check_shard(&self, shard: Shard) -> Result<Shard> {
        self.check_db(shard.db().get())?;
        self.check_tb(shard.tb().get())?;
        Ok(shard)
    }

    /// Clears the routing decision (db and tb indices) of the bound context.
    ///
    /// A data-source override set by an enclosing call stays in place.
    /// Idempotent, and a no-op outside a scope.
    pub fn clear(&self) {
        context::clear();
    }

    /// Returns the configured number of databases.
    #[must_use]
    pub const fn db_count(&self) -> u32 {
        self.config.db_count
    }

    /// Returns the configured number of tables per database.
    #[must_use]
    pub const fn tb_count(&self) -> u32 {
        self.config.tb_count
    }

    /// Returns every shard currently on the ring in `(db, tb)` order.
    pub fn shards(&self) -> impl Iterator<Item = Shard> + '_ {
        self.ring.shards()
    }

    /// Returns the number of shards currently on the ring.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.ring.shard_count()
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Returns the ring.
    #[must_use]
    pub const fn ring(&self) -> &HashRing {
        &self.ring
    }

    /// Adds a shard by name (`"<db>_<tb>"`) to the ring.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::MalformedShardName` for a bad name,
    /// `RoutingError::IndexOutOfRange` for a shard outside the configured
    /// counts, or `RoutingError::DuplicateShard` if it is already present.
    pub fn add_node(&mut self, name: &str) -> Result<Shard> {
        let shard: Shard = name.parse()?;
        self.add_shard(shard)?;
        Ok(shard)
    }

    /// Adds a shard to the ring.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::IndexOutOfRange` for a shard outside the
    /// configured counts, or `RoutingError::DuplicateShard` if it is
    /// already present. The ring is untouched on error.
    pub fn add_shard(&mut self, shard: Shard) -> Result<()> {
        self.check_shard(shard)?;
        self.ring.add_shard(shard)?;
        info!(shard = %shard, shards = self.ring.shard_count(), "added shard");
        Ok(())
    }

    /// Removes a shard by name (`"<db>_<tb>"`) from the ring.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::MalformedShardName` for a bad name, or
    /// `RoutingError::ShardNotFound` if the shard is not on the ring.
    pub fn remove_node(&mut self, name: &str) -> Result<Shard> {
        let shard: Shard = name.parse()?;
        self.remove_shard(shard)?;
        Ok(shard)
    }

    /// Removes a shard from the ring. Its keys move to their clockwise
    /// successors.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::ShardNotFound` if the shard is not on the ring.
    pub fn remove_shard(&mut self, shard: Shard) -> Result<()> {
        self.ring.remove_shard(shard)?;
        info!(shard = %shard, shards = self.ring.shard_count(), "removed shard");
        Ok(())
    }

    fn check_db(&self, db: u32) -> Result<DbIndex> {
        if db >= self.config.db_count {
            return Err(RoutingError::IndexOutOfRange {
                kind: "db",
                index: db,
                count: self.config.db_count,
            });
        }
        Ok(DbIndex::new(db))
    }

    fn check_tb(&self, tb: u32) -> Result<TbIndex> {
        if tb >= self.config.tb_count {
            return Err(RoutingError::IndexOutOfRange {
                kind: "tb",
                index: tb,
                count: self.config.tb_count,
            });
        }
        Ok(TbIndex::new(tb))
    }
}
