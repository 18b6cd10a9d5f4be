//! Hash functions mapping keys onto the 32-bit ring.
//!
//! Both functions are pure: the same bytes always produce the same hash,
//! in every process. An empty key is not special-cased; it hashes like any
//! other input.

use dbroute_core::HashAlgorithm;
use xxhash_rust::xxh3::xxh3_64;

/// FNV-1a 32-bit offset basis.
const FNV_OFFSET_BASIS: u32 = 2_166_136_261;

/// FNV-1a 32-bit prime.
const FNV_PRIME: i32 = 16_777_619;

/// Maps key bytes to a position on the ring.
pub trait HashFunction {
    /// Hashes the given bytes to a 32-bit ring position.
    fn hash(&self, key: &[u8]) -> u32;
}

impl HashFunction for HashAlgorithm {
    #[inline]
    fn hash(&self, key: &[u8]) -> u32 {
        match self {
            Self::Xxh3 => xxh3_32(key),
            Self::Fnv1 => fnv1_32(key),
        }
    }
}

/// Hashes with xxh3 and keeps the upper 32 bits.
#[inline]
#[must_use]
pub fn xxh3_32(key: &[u8]) -> u32 {
    let hash64 = xxh3_64(key);
    // Upper bits are often better distributed.
    (hash64 >> 32) as u32
}

/// Hashes with 32-bit FNV-1a followed by an avalanche mix.
///
/// Arithmetic is done on signed 32-bit values with arithmetic right shifts
/// and the result is folded to its absolute value, so ring positions for
/// ASCII keys match other deployments of the same selector. The single
/// value that has no positive counterpart (`i32::MIN`) is kept as `2^31`.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn fnv1_32(key: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS as i32;
    for &byte in key {
        hash = (hash ^ i32::from(byte)).wrapping_mul(FNV_PRIME);
    }
    hash = hash.wrapping_add(hash << 13);
    hash ^= hash >> 7;
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 17;
    hash = hash.wrapping_add(hash << 5);
    hash.wrapping_abs() as u32
}
