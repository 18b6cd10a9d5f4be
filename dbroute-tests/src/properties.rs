//! Property definitions and checkers for ring routing tests.
//!
//! Properties are invariants every ring must uphold. Each checker takes
//! rings and sample keys and returns the violations it found, so tests can
//! report every broken key instead of stopping at the first one.

use std::collections::BTreeMap;

use dbroute_routing::{HashRing, Shard};

// ============================================================================
// Property Violation Types
// ============================================================================

/// A violation of a ring routing property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyViolation {
    /// A key resolved to different shards on repeated lookups.
    NonDeterministic {
        /// The key.
        key: String,
        /// First resolution.
        first: Shard,
        /// Later, different resolution.
        later: Shard,
    },
    /// A key did not resolve on a non-empty ring.
    Unresolved {
        /// The key.
        key: String,
    },
    /// A key moved although its shard was not removed.
    MovedWithoutCause {
        /// The key.
        key: String,
        /// Shard before the change.
        before: Shard,
        /// Shard after the change.
        after: Shard,
    },
    /// A key on the removed shard did not move to its clockwise successor.
    WrongSuccessor {
        /// The key.
        key: String,
        /// Expected successor.
        expected: Shard,
        /// Actual shard after the removal.
        actual: Option<Shard>,
    },
    /// A key moved after a shard was added, but not onto the added shard.
    MovedPastAddedShard {
        /// The key.
        key: String,
        /// Shard before the change.
        before: Shard,
        /// Shard after the change.
        after: Shard,
    },
    /// The ring holds a different number of entries than expected.
    EntryCount {
        /// Expected `shards * virtual_nodes`.
        expected: usize,
        /// Actual number of entries.
        actual: usize,
    },
}

impl std::fmt::Display for PropertyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonDeterministic { key, first, later } => {
                write!(f, "key {key:?} resolved to {first} then {later}")
            }
            Self::Unresolved { key } => write!(f, "key {key:?} did not resolve"),
            Self::MovedWithoutCause { key, before, after } => {
                write!(f, "key {key:?} moved from {before} to {after} without cause")
            }
            Self::WrongSuccessor {
                key,
                expected,
                actual,
            } => {
                write!(f, "key {key:?} moved to {actual:?}, expected successor {expected}")
            }
            Self::MovedPastAddedShard { key, before, after } => {
                write!(f, "key {key:?} moved from {before} to {after}, not to the added shard")
            }
            Self::EntryCount { expected, actual } => {
                write!(f, "ring has {actual} entries, expected {expected}")
            }
        }
    }
}

/// Key movement observed across a ring change.
#[derive(Debug, Clone, Default)]
pub struct ChurnStats {
    /// Keys checked.
    pub keys: usize,
    /// Keys whose shard changed.
    pub moved: usize,
    /// Keys moved, by destination shard.
    pub moved_to: BTreeMap<Shard, usize>,
}

// ============================================================================
// Property Checkers
// ============================================================================

/// Generates `count` sample keys shaped like entity ids.
#[must_use]
pub fn sample_keys(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("user:{i}")).collect()
}

/// Checks that the ring holds `shards * virtual_nodes` entries.
#[must_use]
pub fn check_entry_count(ring: &HashRing) -> Vec<PropertyViolation> {
    let expected = ring.shard_count() * ring.virtual_nodes() as usize;
    if ring.len() == expected {
        Vec::new()
    } else {
        vec![PropertyViolation::EntryCount {
            expected,
            actual: ring.len(),
        }]
    }
}

/// Checks that every key resolves, and to the same shard on every lookup.
#[must_use]
pub fn check_deterministic_and_total(ring: &HashRing, keys: &[String]) -> Vec<PropertyViolation> {
    let mut violations = Vec::new();

    for key in keys {
        let Ok(first) = ring.resolve(key) else {
            violations.push(PropertyViolation::Unresolved { key: key.clone() });
            continue;
        };
        for _ in 0..3 {
            match ring.resolve(key) {
                Ok(later) if later == first => {}
                Ok(later) => violations.push(PropertyViolation::NonDeterministic {
                    key: key.clone(),
                    first,
                    later,
                }),
                Err(_) => violations.push(PropertyViolation::Unresolved { key: key.clone() }),
            }
        }
    }

    violations
}

/// Checks bounded churn for the removal of `removed` (`before` → `after`).
///
/// Only keys on `removed` may move, and each must land on the first shard
/// clockwise from its hash on `before` that isn't `removed`.
///
/// # Errors
///
/// Returns every violation found.
pub fn check_removal_churn(
    before: &HashRing,
    after: &HashRing,
    removed: Shard,
    keys: &[String],
) -> Result<ChurnStats, Vec<PropertyViolation>> {
    let mut stats = ChurnStats {
        keys: keys.len(),
        ..ChurnStats::default()
    };
    let mut violations = Vec::new();

    for key in keys {
        let hash = before.hash_key(key);
        let (Some(old), new) = (before.resolve_hash(hash), after.resolve_hash(hash)) else {
            violations.push(PropertyViolation::Unresolved { key: key.clone() });
            continue;
        };
        if new == Some(old) {
            continue;
        }

        if old != removed {
            if let Some(new) = new {
                violations.push(PropertyViolation::MovedWithoutCause {
                    key: key.clone(),
                    before: old,
                    after: new,
                });
            }
            continue;
        }

        match before.successor_excluding(hash, removed) {
            Some(expected) if new == Some(expected) => {
                stats.moved += 1;
                *stats.moved_to.entry(expected).or_default() += 1;
            }
            Some(expected) => violations.push(PropertyViolation::WrongSuccessor {
                key: key.clone(),
                expected,
                actual: new,
            }),
            None => violations.push(PropertyViolation::Unresolved { key: key.clone() }),
        }
    }

    if violations.is_empty() {
        Ok(stats)
    } else {
        Err(violations)
    }
}

/// Checks bounded churn for the addition of `added` (`before` → `after`).
///
/// Keys may only move onto `added`.
///
/// # Errors
///
/// Returns every violation found.
pub fn check_addition_churn(
    before: &HashRing,
    after: &HashRing,
    added: Shard,
    keys: &[String],
) -> Result<ChurnStats, Vec<PropertyViolation>> {
    let mut stats = ChurnStats {
        keys: keys.len(),
        ..ChurnStats::default()
    };
    let mut violations = Vec::new();

    for key in keys {
        let (Ok(old), Ok(new)) = (before.resolve(key), after.resolve(key)) else {
            violations.push(PropertyViolation::Unresolved { key: key.clone() });
            continue;
        };
        if old == new {
            continue;
        }
        if new == added {
            stats.moved += 1;
            *stats.moved_to.entry(new).or_default() += 1;
        } else {
            violations.push(PropertyViolation::MovedPastAddedShard {
                key: key.clone(),
                before: old,
                after: new,
            });
        }
    }

    if violations.is_empty() {
        Ok(stats)
    } else {
        Err(violations)
    }
}
