//! Physical shard identity.
//!
//! A shard is one `(database, table)` target. Its name is `"<db>_<tb>"`
//! with unpadded decimal indices; the name seeds the virtual-node hashes,
//! so it must stay stable across releases.

use std::fmt;
use std::str::FromStr;

use dbroute_core::limits::{DB_COUNT_MAX, TB_COUNT_MAX};
use dbroute_core::{DbIndex, TbIndex};

use crate::error::RoutingError;

/// Separator between the database and table index in a shard name.
pub const SHARD_NAME_SEPARATOR: char = '_';

/// Separator between a shard name and its virtual-node sequence number.
pub const VIRTUAL_NODE_SEPARATOR: char = '#';

/// One physical `(database, table)` routing target.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Shard {
    db: DbIndex,
    tb: TbIndex,
}

impl Shard {
    /// Creates a shard from its indices.
    #[inline]
    #[must_use]
    pub const fn new(db: DbIndex, tb: TbIndex) -> Self {
        Self { db, tb }
    }

    /// Returns the database index.
    #[inline]
    #[must_use]
    pub const fn db(self) -> DbIndex {
        self.db
    }

    /// Returns the table index.
    #[inline]
    #[must_use]
    pub const fn tb(self) -> TbIndex {
        self.tb
    }

    /// Returns the shard name, `"<db>_<tb>"`.
    #[must_use]
    pub fn name(self) -> String {
        self.to_string()
    }

    /// Returns the key hashed for virtual node `seq` of this shard.
    #[must_use]
    pub fn virtual_node_key(self, seq: u32) -> String {
        format!("{self}{VIRTUAL_NODE_SEPARATOR}{seq}")
    }
}

impl fmt::Display for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SHARD_NAME_SEPARATOR}{}", self.db.get(), self.tb.get())
    }
}

impl fmt::Debug for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shard({self})")
    }
}

impl FromStr for Shard {
    type Err = RoutingError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let malformed = || RoutingError::malformed_shard_name(name);

        let (db, tb) = name.split_once(SHARD_NAME_SEPARATOR).ok_or_else(malformed)?;
        let db = parse_index(db).ok_or_else(malformed)?;
        let tb = parse_index(tb).ok_or_else(malformed)?;

        // Indices beyond the padded width would render ambiguously.
        if db >= DB_COUNT_MAX || tb >= TB_COUNT_MAX {
            return Err(malformed());
        }

        Ok(Self::new(DbIndex::new(db), TbIndex::new(tb)))
    }
}

/// Parses a plain decimal index: digits only, no sign, no whitespace.
fn parse_index(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
