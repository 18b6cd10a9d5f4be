//! Routing error types.

use dbroute_core::ConfigError;
use thiserror::Error;

/// Result type for routing operations.
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Errors that can occur while building rings or routing keys.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The router configuration was rejected.
    #[error("invalid router configuration: {0}")]
    Config(#[from] ConfigError),

    /// The ring has no entries, so no key can be placed.
    #[error("hash ring is empty")]
    EmptyRing,

    /// A shard name did not have the `<db>_<tb>` form.
    #[error("malformed shard name '{name}', expected '<db>_<tb>'")]
    MalformedShardName {
        /// The rejected name.
        name: String,
    },

    /// The shard is not on the ring.
    #[error("shard '{name}' not found on ring")]
    ShardNotFound {
        /// Name of the missing shard.
        name: String,
    },

    /// The shard is already on the ring.
    #[error("shard '{name}' already on ring")]
    DuplicateShard {
        /// Name of the duplicate shard.
        name: String,
    },

    /// An explicit index is outside the configured range.
    #[error("{kind} index {index} out of range (count {count})")]
    IndexOutOfRange {
        /// Which index ("db" or "tb").
        kind: &'static str,
        /// The rejected index.
        index: u32,
        /// The configured count.
        count: u32,
    },

    /// A routing decision was written outside any routing scope.
    #[error("no active routing context; wrap the call in a routing scope")]
    NoActiveContext,

    /// A named data source override was blank.
    #[error("data source name is blank")]
    BlankDataSource,
}

impl RoutingError {
    /// Create a `MalformedShardName` error.
    #[inline]
    pub fn malformed_shard_name(name: impl Into<String>) -> Self {
        Self::MalformedShardName { name: name.into() }
    }

    /// Create a `ShardNotFound` error.
    #[inline]
    pub fn shard_not_found(name: impl Into<String>) -> Self {
        Self::ShardNotFound { name: name.into() }
    }

    /// Create a `DuplicateShard` error.
    #[inline]
    pub fn duplicate_shard(name: impl Into<String>) -> Self {
        Self::DuplicateShard { name: name.into() }
    }
}
