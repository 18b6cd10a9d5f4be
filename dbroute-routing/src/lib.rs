//! dbroute Routing - Consistent-hash shard routing for database sharding.
//!
//! This crate maps a routing key (a user id, an order id) to the physical
//! `(database, table)` shard that holds its data, and makes that decision
//! visible to the data-access layer for the duration of one call.
//!
//! # Design (`TigerStyle`)
//!
//! - **Consistent hashing**: Keys map deterministically to shards through a
//!   ring with virtual nodes, so adding or removing a shard moves only the
//!   keys next to it
//! - **Call-scoped decisions**: The routing context belongs to one call and
//!   is dropped on every exit path; there is no global routing state
//! - **Read-mostly sharing**: Routing never mutates the ring, so one strategy
//!   serves every concurrent call
//! - **Explicit limits**: Shard counts are bounded by their padded width
//!
//! # Example
//!
//! ```
//! use dbroute_core::RouterConfig;
//! use dbroute_routing::{context, RoutingStrategy};
//!
//! let strategy = RoutingStrategy::new(RouterConfig::new(2, 4)).unwrap();
//!
//! context::sync_scope(|| {
//!     let shard = strategy.route("user:1001").unwrap();
//!     assert!(shard.db().get() < 2 && shard.tb().get() < 4);
//!     assert_eq!(context::current_shard(), Some(shard));
//! });
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod context;
mod error;
pub mod hash;
mod interceptor;
mod key;
mod ring;
mod shard;
mod strategy;

pub use context::RoutingContext;
pub use error::{Result, RoutingError};
pub use hash::HashFunction;
pub use interceptor::DbRouter;
pub use key::RoutingKey;
pub use ring::HashRing;
pub use shard::{Shard, SHARD_NAME_SEPARATOR, VIRTUAL_NODE_SEPARATOR};
pub use strategy::RoutingStrategy;
