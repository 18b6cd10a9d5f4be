//! Router limits and defaults.
//!
//! Following `TigerStyle`: put limits on everything. The index limits are
//! tied to the zero-padded rendering: a database index must fit in 2
//! digits and a table index in 3.

/// Maximum number of databases (indices `00..=99`).
pub const DB_COUNT_MAX: u32 = 100;

/// Maximum number of tables per database (indices `000..=999`).
pub const TB_COUNT_MAX: u32 = 1000;

/// Default number of virtual nodes placed on the ring per shard.
pub const VIRTUAL_NODES_DEFAULT: u32 = 100;

/// Maximum number of virtual nodes per shard.
pub const VIRTUAL_NODES_MAX: u32 = 10_000;
