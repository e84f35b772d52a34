//! Ready-made 32-bit hash functions for building a [`ChainedHashMap`](crate::ChainedHashMap).
//!
//! Any `Fn(&K) -> u32` works as a table's hash function as long as equal
//! keys hash equal; these cover the common cases.

use core::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;

/// Fold a 64-bit hash into 32 bits, mixing in the high half.
#[inline]
pub fn fold(h: u64) -> u32 {
    (h ^ (h >> 32)) as u32
}

/// Hash any `K: Hash` through std's SipHash with fixed keys.
///
/// The result is deterministic across runs, unlike `RandomState`.
pub fn std_hash<K: Hash + ?Sized>(key: &K) -> u32 {
    let mut h = DefaultHasher::new();
    key.hash(&mut h);
    fold(h.finish())
}

/// Integer hash: the value itself with the high half folded in.
#[inline]
pub fn int_hash(n: u64) -> u32 {
    fold(n)
}

/// Jenkins one-at-a-time hash over the UTF-8 bytes of `s`.
pub fn text_hash(s: &str) -> u32 {
    let mut h: u32 = 0;
    for &b in s.as_bytes() {
        h = h.wrapping_add(u32::from(b));
        h = h.wrapping_add(h << 10);
        h ^= h >> 6;
    }
    h = h.wrapping_add(h << 3);
    h ^= h >> 11;
    h.wrapping_add(h << 15)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_hash_agrees_for_equal_keys() {
        let a = String::from("chained");
        assert_eq!(std_hash(&a), std_hash("chained"));
        assert_eq!(std_hash(&42u64), std_hash(&42u64));
    }

    #[test]
    fn int_hash_is_identity_below_u32_max() {
        assert_eq!(int_hash(0), 0);
        assert_eq!(int_hash(99), 99);
        assert_eq!(int_hash(u64::from(u32::MAX)), u32::MAX);
        assert_eq!(int_hash(1 << 32), 1);
    }

    #[test]
    fn text_hash_known_values() {
        assert_eq!(text_hash(""), 0);
        // Reference value for the one-at-a-time hash of "a".
        assert_eq!(text_hash("a"), 0xca2e_9442);
        assert_ne!(text_hash("ab"), text_hash("ba"));
    }
}
