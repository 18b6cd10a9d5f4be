//! Router configuration.
//!
//! The configuration is supplied once at startup. Changing the shard counts
//! means building a new strategy; there is no live reconfiguration.
//!
//! # Example
//!
//! ```
//! use dbroute_core::{HashAlgorithm, RouterConfig};
//!
//! let config = RouterConfig::from_toml(
//!     r#"
//!     db_count = 2
//!     tb_count = 4
//!     hash = "fnv1"
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.shard_count(), 8);
//! assert_eq!(config.virtual_nodes, 100);
//! assert_eq!(config.hash, HashAlgorithm::Fnv1);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::limits::{DB_COUNT_MAX, TB_COUNT_MAX, VIRTUAL_NODES_DEFAULT, VIRTUAL_NODES_MAX};

/// Hash function used to place virtual nodes and keys on the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// Upper 32 bits of xxh3-64.
    #[default]
    Xxh3,
    /// 32-bit FNV-1a with a final avalanche mix.
    Fnv1,
}

/// Configuration for a routing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Number of physical databases.
    pub db_count: u32,
    /// Number of tables per database.
    pub tb_count: u32,
    /// Virtual nodes placed on the ring per shard.
    pub virtual_nodes: u32,
    /// Hash function for ring placement.
    pub hash: HashAlgorithm,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            db_count: 1,
            tb_count: 1,
            virtual_nodes: VIRTUAL_NODES_DEFAULT,
            hash: HashAlgorithm::default(),
        }
    }
}

impl RouterConfig {
    /// Creates a configuration with the given shard counts and defaults
    /// for everything else.
    #[must_use]
    pub fn new(db_count: u32, tb_count: u32) -> Self {
        Self {
            db_count,
            tb_count,
            ..Self::default()
        }
    }

    /// Sets the number of virtual nodes per shard.
    #[must_use]
    pub const fn with_virtual_nodes(mut self, virtual_nodes: u32) -> Self {
        self.virtual_nodes = virtual_nodes;
        self
    }

    /// Sets the hash algorithm.
    #[must_use]
    pub const fn with_hash(mut self, hash: HashAlgorithm) -> Self {
        self.hash = hash;
        self
    }

    /// Returns the number of physical shards (`db_count * tb_count`).
    #[must_use]
    pub const fn shard_count(&self) -> u32 {
        self.db_count.saturating_mul(self.tb_count)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a count is zero or exceeds its limit.
    pub fn validate(&self) -> Result<()> {
        if self.db_count == 0 {
            return Err(ConfigError::InvalidArgument {
                name: "db_count",
                reason: "must be positive",
            });
        }
        if self.tb_count == 0 {
            return Err(ConfigError::InvalidArgument {
                name: "tb_count",
                reason: "must be positive",
            });
        }
        Self::validate_virtual_nodes(self.virtual_nodes)?;

        if self.db_count > DB_COUNT_MAX {
            return Err(ConfigError::LimitExceeded {
                limit: "db_count",
                max: DB_COUNT_MAX,
                actual: self.db_count,
            });
        }
        if self.tb_count > TB_COUNT_MAX {
            return Err(ConfigError::LimitExceeded {
                limit: "tb_count",
                max: TB_COUNT_MAX,
                actual: self.tb_count,
            });
        }

        Ok(())
    }

    /// Validates a virtual-node count on its own, for rings built without
    /// a full configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the count is zero or exceeds its limit.
    pub fn validate_virtual_nodes(virtual_nodes: u32) -> Result<()> {
        if virtual_nodes == 0 {
            return Err(ConfigError::InvalidArgument {
                name: "virtual_nodes",
                reason: "must be positive",
            });
        }
        if virtual_nodes > VIRTUAL_NODES_MAX {
            return Err(ConfigError::LimitExceeded {
                limit: "virtual_nodes",
                max: VIRTUAL_NODES_MAX,
                actual: virtual_nodes,
            });
        }
        Ok(())
    }

    /// Loads a configuration from a TOML file and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parses a configuration from a TOML string and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML cannot be parsed or the values are invalid.
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Serialize` if the TOML encoder fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            message: e.to_string(),
        })
    }
}
