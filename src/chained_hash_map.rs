//! ChainedHashMap: the table controller.
//!
//! Owns the bucket array, the caller's equality and hash functions and the
//! resize policy. Every public operation hashes the key once, reduces the
//! hash modulo the bucket count and scans a single chain.

use core::fmt;
use core::hash::Hash;
use core::mem;

use tracing::{debug, trace};

use crate::bucket_array::{bucket_index, BucketArray, Entry};
use crate::hash::std_hash;
use crate::iter::{Iter, IterMut, Keys, Values, ValuesMut};
use crate::policy::ResizePolicy;

/// Initial bucket count used by [`Default`] and [`FromIterator`].
pub const DEFAULT_CAPACITY: usize = 8;

/// Equality of a [`StdChainedHashMap`]: `K: Eq`.
pub type StdEq<K> = fn(&K, &K) -> bool;
/// Hash of a [`StdChainedHashMap`]: [`std_hash`].
pub type StdHash<K> = fn(&K) -> u32;

/// A `ChainedHashMap` keyed through `K: Eq + Hash`.
pub type StdChainedHashMap<K, V> = ChainedHashMap<K, V, StdEq<K>, StdHash<K>>;

/// A hash table with separate chaining and caller-supplied key functions.
///
/// `eq` and `hash` must agree: keys that compare equal must hash equal.
/// The table does not check this; a mismatched pair yields missed lookups
/// and duplicate keys but never memory unsafety.
#[derive(Clone)]
pub struct ChainedHashMap<K, V, E, H> {
    buckets: BucketArray<K, V>,
    eq: E,
    hash: H,
    policy: ResizePolicy,
}

/// Chain length distribution of a table.
#[cfg(feature = "stats")]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ChainStats {
    pub capacity: usize,
    pub len: usize,
    pub longest_chain: usize,
    pub empty_buckets: usize,
}

impl<K, V, E, H> ChainedHashMap<K, V, E, H>
where
    E: Fn(&K, &K) -> bool,
    H: Fn(&K) -> u32,
{
    /// Create an empty table with `initial_capacity` buckets (at least one)
    /// and the default [`ResizePolicy`].
    pub fn new(initial_capacity: usize, eq: E, hash: H) -> Self {
        Self::with_policy(initial_capacity, ResizePolicy::default(), eq, hash)
    }

    pub fn with_policy(initial_capacity: usize, policy: ResizePolicy, eq: E, hash: H) -> Self {
        Self {
            buckets: BucketArray::new(initial_capacity),
            eq,
            hash,
            policy,
        }
    }

    /// Build a table by `put`ting each pair of `source` in order; later
    /// duplicates overwrite earlier ones.
    pub fn from_iter_with<I>(source: I, initial_capacity: usize, eq: E, hash: H) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::new(initial_capacity, eq, hash);
        map.extend(source);
        map
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Same as [`len`](Self::len).
    #[inline]
    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current number of buckets. Only ever grows.
    pub fn capacity(&self) -> usize {
        self.buckets.capacity()
    }

    pub fn policy(&self) -> ResizePolicy {
        self.policy
    }

    #[inline]
    fn index_of(&self, hash: u32) -> usize {
        bucket_index(hash, self.capacity())
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let index = self.index_of((self.hash)(key));
        let eq = &self.eq;
        self.buckets
            .find(index, |e| eq(&e.key, key))
            .map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.index_of((self.hash)(key));
        let eq = &self.eq;
        self.buckets
            .find_mut(index, |e| eq(&e.key, key))
            .map(|e| &mut e.value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Insert or overwrite. An existing entry keeps its chain position.
    pub fn put(&mut self, key: K, value: V) {
        let _ = self.replace(key, value);
    }

    /// Like [`put`](Self::put), returning the value it overwrote.
    pub fn replace(&mut self, key: K, value: V) -> Option<V> {
        let hash = (self.hash)(&key);
        let index = self.index_of(hash);
        let eq = &self.eq;
        if let Some(entry) = self.buckets.find_mut(index, |e| eq(&e.key, &key)) {
            return Some(mem::replace(&mut entry.value, value));
        }
        self.buckets.link_front(index, Entry::new(key, value, hash));
        self.grow_if_needed();
        None
    }

    /// Remove `key` if present; absent keys are ignored.
    pub fn delete(&mut self, key: &K) {
        let _ = self.remove(key);
    }

    /// Like [`delete`](Self::delete), returning the removed value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.index_of((self.hash)(key));
        let eq = &self.eq;
        self.buckets
            .unlink(index, |e| eq(&e.key, key))
            .map(|e| e.value)
    }

    /// Drop every entry. The bucket count is kept.
    pub fn clear(&mut self) {
        trace!(len = self.len(), capacity = self.capacity(), "clearing table");
        self.buckets.clear();
    }

    /// Full rehash into a larger bucket array once the load factor is
    /// exceeded. Cached hashes are reused; the key's hash function is not
    /// called.
    fn grow_if_needed(&mut self) {
        let len = self.len();
        let old_capacity = self.capacity();
        if !self.policy.should_grow(len, old_capacity) {
            return;
        }
        let new_capacity = self.policy.grown_capacity(len, old_capacity);
        if new_capacity == old_capacity {
            return;
        }
        debug!(old_capacity, new_capacity, len, "growing bucket array");
        self.buckets.relink(new_capacity);
        debug_assert!(self.buckets.is_consistent());
    }

    /// Entries in bucket order: ascending bucket index, each chain newest first.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.buckets)
    }

    /// Same as [`iter`](Self::iter).
    #[inline]
    pub fn entries(&self) -> Iter<'_, K, V> {
        self.iter()
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Same as [`values`](Self::values).
    #[inline]
    pub fn vals(&self) -> Values<'_, K, V> {
        self.values()
    }

    /// Mutable access to every value, in the same order as [`iter`](Self::iter).
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.buckets.ordered_mut().into_iter(),
        }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Independent copy holding the same pairs and bucket count, keyed
    /// through `eq` and `hash`. Hashes are recomputed with `hash`.
    pub fn clone_with<E2, H2>(&self, eq: E2, hash: H2) -> ChainedHashMap<K, V, E2, H2>
    where
        K: Clone,
        V: Clone,
        E2: Fn(&K, &K) -> bool,
        H2: Fn(&K) -> u32,
    {
        self.map_filter(eq, hash, |_, v| Some(v.clone()))
    }

    /// New table with the same keys, each value replaced by `f(key, value)`.
    pub fn map_values<W, E2, H2, F>(
        &self,
        eq: E2,
        hash: H2,
        mut f: F,
    ) -> ChainedHashMap<K, W, E2, H2>
    where
        K: Clone,
        E2: Fn(&K, &K) -> bool,
        H2: Fn(&K) -> u32,
        F: FnMut(&K, &V) -> W,
    {
        self.map_filter(eq, hash, |k, v| Some(f(k, v)))
    }

    /// New table keeping the keys for which `f` returns `Some`, with that value.
    pub fn map_filter<W, E2, H2, F>(
        &self,
        eq: E2,
        hash: H2,
        mut f: F,
    ) -> ChainedHashMap<K, W, E2, H2>
    where
        K: Clone,
        E2: Fn(&K, &K) -> bool,
        H2: Fn(&K) -> u32,
        F: FnMut(&K, &V) -> Option<W>,
    {
        let mut out = ChainedHashMap::with_policy(self.capacity(), self.policy, eq, hash);
        for (k, v) in self.iter() {
            if let Some(w) = f(k, v) {
                out.put(k.clone(), w);
            }
        }
        out
    }

    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.buckets.is_consistent()
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> ChainStats {
        let mut stats = ChainStats {
            capacity: self.capacity(),
            len: self.len(),
            ..ChainStats::default()
        };
        for n in self.buckets.chain_lengths() {
            stats.longest_chain = stats.longest_chain.max(n);
            if n == 0 {
                stats.empty_buckets += 1;
            }
        }
        stats
    }
}

impl<K, V> StdChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    /// Empty table keyed through `K: Eq` and [`std_hash`].
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self::new(initial_capacity, <K as PartialEq>::eq, std_hash::<K>)
    }
}

impl<K, V> Default for StdChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl<K, V> FromIterator<(K, V)> for StdChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<K, V, E, H> Extend<(K, V)> for ChainedHashMap<K, V, E, H>
where
    E: Fn(&K, &K) -> bool,
    H: Fn(&K) -> u32,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.put(k, v);
        }
    }
}

impl<K, V, E, H> fmt::Debug for ChainedHashMap<K, V, E, H>
where
    K: fmt::Debug,
    V: fmt::Debug,
    E: Fn(&K, &K) -> bool,
    H: Fn(&K) -> u32,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, E, H> IntoIterator for &'a ChainedHashMap<K, V, E, H>
where
    E: Fn(&K, &K) -> bool,
    H: Fn(&K) -> u32,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, E, H> IntoIterator for &'a mut ChainedHashMap<K, V, E, H>
where
    E: Fn(&K, &K) -> bool,
    H: Fn(&K) -> u32,
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::BTreeSet;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn u32_map(
        capacity: usize,
    ) -> ChainedHashMap<u32, u32, impl Fn(&u32, &u32) -> bool, impl Fn(&u32) -> u32> {
        ChainedHashMap::new(capacity, |a: &u32, b: &u32| a == b, |k: &u32| *k)
    }

    /// Invariant: an empty table has size 0 and every lookup misses.
    #[test]
    fn empty_table() {
        let m = u32_map(4);
        assert_eq!(m.size(), 0);
        assert!(m.is_empty());
        assert_eq!(m.get(&0), None);
        assert_eq!(m.get(&12345), None);
        assert_eq!(m.iter().count(), 0);
    }

    #[test]
    fn put_two_keys() {
        let mut m = u32_map(4);
        m.put(1, 1);
        m.put(2, 2);
        assert_eq!(m.size(), 2);
        assert_eq!(m.get(&1), Some(&1));
        assert_eq!(m.get(&2), Some(&2));
    }

    /// Invariant: resizes from a small start lose nothing and capacity only grows.
    #[test]
    fn hundred_keys_from_capacity_three() {
        let mut m = u32_map(3);
        let mut last_capacity = m.capacity();
        let mut resizes = 0;
        for k in 0..100 {
            m.put(k, k * 7);
            assert!(m.capacity() >= last_capacity);
            if m.capacity() > last_capacity {
                resizes += 1;
            }
            last_capacity = m.capacity();
        }
        assert!(resizes > 1, "expected several resizes, saw {resizes}");
        assert_eq!(m.size(), 100);
        for k in 0..100 {
            assert_eq!(m.get(&k), Some(&(k * 7)));
        }
        assert!(m.buckets.is_consistent());
    }

    /// Invariant: re-putting a key overwrites in place without changing size.
    #[test]
    fn overwrite_keeps_size() {
        let mut m = u32_map(4);
        m.put(1, 1);
        m.put(2, 2);
        let before = m.size();
        m.put(2, 102);
        assert_eq!(m.get(&2), Some(&102));
        assert_eq!(m.size(), before);
    }

    /// Invariant: overwriting keeps the entry's position in bucket order.
    #[test]
    fn overwrite_keeps_position() {
        let mut m = ChainedHashMap::new(1, |a: &u32, b: &u32| a == b, |_: &u32| 0);
        m.put(1, 1);
        m.put(2, 2);
        m.put(3, 3);
        let before: Vec<u32> = m.keys().copied().collect();
        m.put(2, 20);
        let after: Vec<u32> = m.keys().copied().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn delete_middle_key() {
        let mut m = u32_map(4);
        for k in [1, 2, 4] {
            m.put(k, k);
        }
        m.delete(&2);
        assert_eq!(m.get(&2), None);
        assert_eq!(m.size(), 2);
        assert_eq!(m.get(&4), Some(&4));
        assert_eq!(m.get(&1), Some(&1));
    }

    /// Invariant: deleting an absent key is a silent no-op.
    #[test]
    fn delete_absent_is_noop() {
        let mut m = u32_map(4);
        m.put(1, 1);
        m.delete(&9);
        assert_eq!(m.size(), 1);
        assert_eq!(m.remove(&9), None);
        assert_eq!(m.size(), 1);
    }

    #[test]
    fn replace_and_remove_return_previous() {
        let mut m = u32_map(2);
        assert_eq!(m.replace(5, 50), None);
        assert_eq!(m.replace(5, 51), Some(50));
        assert_eq!(m.size(), 1);
        assert_eq!(m.remove(&5), Some(51));
        assert_eq!(m.remove(&5), None);
        assert!(m.is_empty());
    }

    /// Invariant: heavy chaining under a banded hash still resolves every key.
    #[test]
    fn forced_collisions() {
        let banded = |k: &u32| match *k {
            0..=9 => 0,
            10..=19 => 1,
            _ => *k,
        };
        let mut m = ChainedHashMap::new(4, |a: &u32, b: &u32| a == b, banded);
        for k in 0..100 {
            m.put(k, k + 1000);
        }
        assert_eq!(m.size(), 100);
        for k in 0..100 {
            assert_eq!(m.get(&k), Some(&(k + 1000)));
        }
        assert!(m.buckets.is_consistent());
    }

    /// Invariant: capacity never shrinks, even when the table is emptied.
    #[test]
    fn capacity_never_shrinks() {
        let mut m = u32_map(1);
        for k in 0..50 {
            m.put(k, k);
        }
        let grown = m.capacity();
        for k in 0..50 {
            m.delete(&k);
        }
        assert!(m.is_empty());
        assert_eq!(m.capacity(), grown);
        m.put(1, 1);
        m.clear();
        assert_eq!(m.capacity(), grown);
        assert_eq!(m.get(&1), None);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut m = u32_map(0);
        assert_eq!(m.capacity(), 1);
        m.put(7, 7);
        assert_eq!(m.get(&7), Some(&7));
    }

    /// Invariant: a resize reuses cached hashes and never calls `hash` again.
    #[test]
    fn resize_does_not_rehash_keys() {
        let calls = Cell::new(0usize);
        let mut m = ChainedHashMap::new(1, |a: &u32, b: &u32| a == b, |k: &u32| {
            calls.set(calls.get() + 1);
            *k
        });
        for k in 0..64 {
            m.put(k, k);
        }
        assert!(m.capacity() > 1);
        assert_eq!(calls.get(), 64, "one hash call per put");
    }

    /// Invariant: iteration walks ascending buckets, each chain newest first.
    #[test]
    fn iteration_order_is_bucket_then_chain() {
        let mut m = ChainedHashMap::with_policy(
            4,
            ResizePolicy::new(10, 1, 1),
            |a: &u32, b: &u32| a == b,
            |k: &u32| *k,
        );
        for k in [1, 5, 2, 9, 0] {
            m.put(k, k);
        }
        assert_eq!(m.capacity(), 4);
        let keys: Vec<u32> = m.keys().copied().collect();
        assert_eq!(keys, vec![0, 9, 5, 1, 2]);
        let vals: Vec<u32> = m.vals().copied().collect();
        assert_eq!(vals, keys);
        assert_eq!(m.entries().len(), 5);

        // Mutable walks follow the same order.
        let mutable: Vec<u32> = m.iter_mut().map(|(k, _)| *k).collect();
        assert_eq!(mutable, keys);
        for (i, v) in m.values_mut().enumerate() {
            *v = i as u32;
        }
        let renumbered: Vec<u32> = m.vals().copied().collect();
        assert_eq!(renumbered, vec![0, 1, 2, 3, 4]);
    }

    /// Invariant: only an insert that raises the size can trigger a resize;
    /// overwrites never do.
    #[test]
    fn overwrite_never_resizes() {
        let mut m = u32_map(8);
        // 6 of 8 buckets sits exactly at the 3/4 load factor.
        for k in 0..6 {
            m.put(k, k);
        }
        assert_eq!(m.capacity(), 8);
        for round in 0..20 {
            m.put(round % 6, round);
            assert!(m.replace(5, round).is_some());
            assert_eq!(m.capacity(), 8);
        }
        assert_eq!(m.capacity(), 8);
        assert_eq!(m.size(), 6);
        m.put(6, 6);
        assert!(m.capacity() > 8);
    }

    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureGuard;

        fn make_writer(&'a self) -> Self::Writer {
            CaptureGuard(self.0.clone())
        }
    }

    struct CaptureGuard(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CaptureGuard {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Invariant: every resize emits one debug event carrying both capacities.
    #[test]
    fn resize_emits_debug_event() {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(CaptureWriter(buffer.clone()))
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut m = u32_map(4);
            for k in 0..3 {
                m.put(k, k);
            }
            m.put(3, 3);
            assert_eq!(m.capacity(), 8);
        });

        let out = String::from_utf8_lossy(&buffer.lock().unwrap()).into_owned();
        assert_eq!(out.matches("growing bucket array").count(), 1);
        assert!(out.contains("old_capacity=4"), "{out}");
        assert!(out.contains("new_capacity=8"), "{out}");
    }

    #[test]
    fn get_mut_and_values_mut() {
        let mut m = u32_map(4);
        for k in 0..10 {
            m.put(k, k);
        }
        if let Some(v) = m.get_mut(&3) {
            *v = 300;
        }
        assert_eq!(m.get(&3), Some(&300));
        for v in m.values_mut() {
            *v += 1;
        }
        assert_eq!(m.get(&3), Some(&301));
        assert_eq!(m.get(&0), Some(&1));
        let keys: BTreeSet<u32> = (&mut m).into_iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, (0..10).collect());
    }

    /// Invariant: derived tables keep the source's capacity and policy.
    #[test]
    fn derived_tables_keep_capacity() {
        let mut m = u32_map(3);
        for k in 0..40 {
            m.put(k, k);
        }
        let c = m.clone_with(|a: &u32, b: &u32| a == b, |k: &u32| k.wrapping_mul(31));
        assert_eq!(c.capacity(), m.capacity());
        let doubled = m.map_values(|a: &u32, b: &u32| a == b, |k: &u32| *k, |_, v| v * 2);
        assert_eq!(doubled.capacity(), m.capacity());
        assert_eq!(doubled.get(&20), Some(&40));
        let evens = m.map_filter(
            |a: &u32, b: &u32| a == b,
            |k: &u32| *k,
            |k, v| (k % 2 == 0).then_some(*v),
        );
        assert_eq!(evens.capacity(), m.capacity());
        assert_eq!(evens.len(), 20);
        assert_eq!(evens.policy(), m.policy());
    }

    #[test]
    fn std_map_round_trip() {
        let mut m: StdChainedHashMap<String, usize> = StdChainedHashMap::default();
        assert_eq!(m.capacity(), DEFAULT_CAPACITY);
        m.put("a".to_string(), 1);
        m.put("b".to_string(), 2);
        assert_eq!(m.get(&"a".to_string()), Some(&1));
        assert!(m.contains_key(&"b".to_string()));
        let only_a = m.map_filter(<String as PartialEq>::eq, std_hash::<String>, |k, v| {
            (k == "a").then_some(*v)
        });
        assert_eq!(format!("{:?}", only_a), r#"{"a": 1}"#);
    }

    #[cfg(feature = "stats")]
    #[test]
    fn stats_reflect_chains() {
        let mut m = ChainedHashMap::new(4, |a: &u32, b: &u32| a == b, |_: &u32| 0);
        for k in 0..3 {
            m.put(k, k);
        }
        let s = m.stats();
        assert_eq!(s.capacity, 4);
        assert_eq!(s.len, 3);
        assert_eq!(s.longest_chain, 3);
        assert_eq!(s.empty_buckets, 3);
    }
}
