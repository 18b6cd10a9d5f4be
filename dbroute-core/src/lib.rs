//! dbroute Core - Strongly-typed shard indices and router configuration.
//!
//! This crate provides the types shared by the routing core and its
//! collaborators. It does NOT route anything itself; hashing, the ring and
//! the routing context live in `dbroute-routing`.
//!
//! # Design Principles (TigerStyle)
//!
//! - **Strongly-typed indices**: Prevent mixing up `DbIndex` with `TbIndex`
//! - **Explicit limits**: Shard counts are bounded by their padded width
//! - **Fail at startup**: Invalid configuration never reaches the hot path
//! - **No unsafe code**: Safety > Performance

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod error;
pub mod limits;
mod types;

pub use config::{HashAlgorithm, RouterConfig};
pub use error::{ConfigError, Result};
pub use types::{DbIndex, TbIndex};
