//! dbroute Tests - Integration tests for dbroute.
//!
//! Unit tests live inline in each crate under `#[cfg(test)]`. This crate
//! holds the tests that exercise several components together:
//!
//! ## Test Organization
//!
//! **Integration Tests** (`*_tests.rs`):
//! - `routing_tests`: end-to-end routing through a configured strategy
//! - `churn_tests`: key movement when shards leave or join the ring
//! - `context_tests`: isolation and cleanup of call-scoped contexts
//! - `interceptor_tests`: operations bracketed by `DbRouter`
//! - `config_tests`: strategies built from TOML configuration files
//!
//! **Support Modules**:
//! - `properties`: ring properties (determinism, bounded churn, ...) and
//!   their checkers
//!
//! ## Naming Conventions
//!
//! - Integration tests: `test_<component>_<scenario>`
//! - Unit tests: Inline in each crate under `#[cfg(test)]`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod properties;

#[cfg(test)]
mod interceptor_tests;
