//! Consistent-hash ring with virtual nodes.
//!
//! Every shard is placed on the 32-bit ring at `virtual_nodes` positions,
//! `hash("<db>_<tb>#<seq>")` for `seq` in `1..=virtual_nodes`. A key is
//! owned by the first entry clockwise from `hash(key)`, wrapping around to
//! the lowest entry when the key hashes past the highest one.
//!
//! Removing a shard only moves the keys its virtual nodes owned, each to the
//! next entry clockwise. Adding a shard only pulls keys away from the
//! entries that now follow its virtual nodes.
//!
//! # Collisions
//!
//! Two virtual nodes hashing to the same position are not resolved: the
//! later insert overwrites the earlier one, so the ring may hold slightly
//! fewer than `shards * virtual_nodes` entries.

use std::collections::{BTreeMap, BTreeSet};

use dbroute_core::{DbIndex, HashAlgorithm, RouterConfig, TbIndex};
use tracing::{debug, info};

use crate::error::{Result, RoutingError};
use crate::hash::HashFunction;
use crate::key::RoutingKey;
use crate::shard::Shard;

/// Ordered mapping from ring position to shard.
#[derive(Debug, Clone)]
pub struct HashRing {
    /// Ring entries: virtual-node hash → owning shard.
    entries: BTreeMap<u32, Shard>,
    /// Physical shards currently on the ring.
    shards: BTreeSet<Shard>,
    /// Virtual nodes placed per shard.
    virtual_nodes: u32,
    /// Hash function for keys and virtual nodes.
    algorithm: HashAlgorithm,
}

impl HashRing {
    /// Creates an empty ring.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::Config` if `virtual_nodes` is zero or exceeds
    /// its limit.
    pub fn new(virtual_nodes: u32, algorithm: HashAlgorithm) -> Result<Self> {
        RouterConfig::validate_virtual_nodes(virtual_nodes)?;
        Ok(Self {
            entries: BTreeMap::new(),
            shards: BTreeSet::new(),
            virtual_nodes,
            algorithm,
        })
    }

    /// Builds a ring for `db_count * tb_count` shards with default
    /// virtual-node count and hash.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::Config` if either count is zero or too large.
    pub fn build(db_count: u32, tb_count: u32) -> Result<Self> {
        Self::from_config(&RouterConfig::new(db_count, tb_count))
    }

    /// Builds a ring with one shard per `(db, tb)` pair of the configuration.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::Config` if the configuration is invalid.
    pub fn from_config(config: &RouterConfig) -> Result<Self> {
        config.validate()?;

        let mut ring = Self::new(config.virtual_nodes, config.hash)?;
        for db in 0..config.db_count {
            for tb in 0..config.tb_count {
                ring.insert(Shard::new(DbIndex::new(db), TbIndex::new(tb)));
            }
        }

        info!(
            db_count = config.db_count,
            tb_count = config.tb_count,
            virtual_nodes = config.virtual_nodes,
            entries = ring.len(),
            hash = ?config.hash,
            "built hash ring"
        );
        Ok(ring)
    }

    /// Adds a shard by name (`"<db>_<tb>"`).
    ///
    /// # Errors
    ///
    /// Returns an error if the name is malformed or the shard is already
    /// on the ring.
    pub fn add_node(&mut self, name: &str) -> Result<Shard> {
        let shard: Shard = name.parse()?;
        self.add_shard(shard)?;
        Ok(shard)
    }

    /// Adds a shard and all of its virtual nodes.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::DuplicateShard` if the shard is already present.
    pub fn add_shard(&mut self, shard: Shard) -> Result<()> {
        if self.shards.contains(&shard) {
            return Err(RoutingError::duplicate_shard(shard.name()));
        }
        self.insert(shard);
        debug!(shard = %shard, entries = self.len(), "added shard to ring");
        Ok(())
    }

    /// Removes a shard by name (`"<db>_<tb>"`).
    ///
    /// # Errors
    ///
    /// Returns an error if the name is malformed or the shard is not present.
    pub fn remove_node(&mut self, name: &str) -> Result<Shard> {
        let shard: Shard = name.parse()?;
        self.remove_shard(shard)?;
        Ok(shard)
    }

    /// Removes a shard and every ring entry it still owns.
    ///
    /// Entries the shard lost to a collision belong to the other shard and
    /// are left in place.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::ShardNotFound` if the shard is not present.
    pub fn remove_shard(&mut self, shard: Shard) -> Result<()> {
        if !self.shards.remove(&shard) {
            return Err(RoutingError::shard_not_found(shard.name()));
        }

        for seq in 1..=self.virtual_nodes {
            let hash = self.hash_bytes(shard.virtual_node_key(seq).as_bytes());
            if self.entries.get(&hash) == Some(&shard) {
                self.entries.remove(&hash);
            }
        }

        debug!(shard = %shard, entries = self.len(), "removed shard from ring");
        Ok(())
    }

    /// Returns the ring position of a key.
    #[inline]
    pub fn hash_key<K: RoutingKey + ?Sized>(&self, key: &K) -> u32 {
        self.hash_bytes(&key.routing_bytes())
    }

    /// Returns the shard owning a key.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::EmptyRing` if the ring has no entries.
    pub fn resolve<K: RoutingKey + ?Sized>(&self, key: &K) -> Result<Shard> {
        self.resolve_hash(self.hash_key(key))
            .ok_or(RoutingError::EmptyRing)
    }

    /// Returns the shard owning a ring position: the first entry at or
    /// after `hash`, wrapping around to the lowest entry.
    #[must_use]
    pub fn resolve_hash(&self, hash: u32) -> Option<Shard> {
        self.entries
            .range(hash..)
            .next()
            .or_else(|| self.entries.iter().next())
            .map(|(_, shard)| {
                debug_assert!(self.shards.contains(shard), "ring entry for unregistered shard");
                *shard
            })
    }

    /// Returns the first shard clockwise from `hash` other than `excluded`.
    ///
    /// This is where keys owned by `excluded` at `hash` move when it is
    /// removed from the ring.
    #[must_use]
    pub fn successor_excluding(&self, hash: u32, excluded: Shard) -> Option<Shard> {
        self.entries
            .range(hash..)
            .chain(self.entries.range(..hash))
            .map(|(_, shard)| *shard)
            .find(|shard| *shard != excluded)
    }

    /// Counts how many of the given keys each shard owns.
    ///
    /// Shards that own none of the keys are reported with a count of zero.
    pub fn distribution<I>(&self, keys: I) -> BTreeMap<Shard, usize>
    where
        I: IntoIterator,
        I::Item: RoutingKey,
    {
        let mut counts: BTreeMap<Shard, usize> =
            self.shards.iter().map(|shard| (*shard, 0)).collect();
        for key in keys {
            if let Some(shard) = self.resolve_hash(self.hash_key(&key)) {
                *counts.entry(shard).or_default() += 1;
            }
        }
        counts
    }

    /// Returns the number of ring entries (virtual nodes).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the ring has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of physical shards on the ring.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Returns the number of virtual nodes placed per shard.
    #[must_use]
    pub const fn virtual_nodes(&self) -> u32 {
        self.virtual_nodes
    }

    /// Returns the hash algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Returns true if the shard is on the ring.
    #[must_use]
    pub fn contains(&self, shard: Shard) -> bool {
        self.shards.contains(&shard)
    }

    /// Returns the physical shards in `(db, tb)` order.
    pub fn shards(&self) -> impl Iterator<Item = Shard> + '_ {
        self.shards.iter().copied()
    }

    /// Returns the ring entries in ascending hash order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, Shard)> + '_ {
        self.entries.iter().map(|(hash, shard)| (*hash, *shard))
    }

    fn hash_bytes(&self, bytes: &[u8]) -> u32 {
        self.algorithm.hash(bytes)
    }

    /// Places every virtual node of `shard` on the ring.
    fn insert(&mut self, shard: Shard) {
        for seq in 1..=self.virtual_nodes {
            let hash = self.hash_bytes(shard.virtual_node_key(seq).as_bytes());
            if let Some(previous) = self.entries.insert(hash, shard) {
                if previous != shard {
                    debug!(hash, previous = %previous, shard = %shard, "virtual node collision");
                }
            }
        }
        self.shards.insert(shard);
    }
}
