//! chained-hashmap: a single-threaded hash table with separate chaining
//! and caller-supplied equality and hash functions.
//!
//! Internal Design:
//!
//! Layers
//! - BucketArray<K, V>: storage only. A vector of chain heads plus a
//!   `SlotMap` arena of entries, each holding its key, value, cached
//!   `u32` hash and the arena key of the next entry in its chain.
//! - ChainedHashMap<K, V, E, H>: the controller. Hashes keys with `H`,
//!   compares them with `E`, scans one chain per operation and grows the
//!   bucket array according to a `ResizePolicy`.
//! - Iterators and derived tables: `iter`/`keys`/`values` walk buckets in
//!   ascending index order and chains from head to tail; `clone_with`,
//!   `map_values`, `map_filter` and `from_iter_with` build new tables.
//!
//! Invariants
//! - No two entries hold keys that are equal under `E`.
//! - An entry with cached hash `h` lives in bucket `h % capacity`.
//! - `len()` equals the total length of all chains.
//! - Capacity is at least one and never decreases, not even on `clear`.
//!
//! Hashing and resizing
//! - `H` runs exactly once per `put`/`replace`/`get`/`remove` call. A resize
//!   relinks entries by their cached hash; user code is never called while
//!   the table is being rebuilt.
//! - New entries go to the head of their chain, on insert and on resize.
//! - The default policy grows when `len / capacity > 3/4`, to
//!   `max(2 * capacity, capacity + 4)` buckets, in one O(n) pass.
//!
//! Notes and non-goals
//! - No internal locking; callers serialize access themselves.
//! - Mismatched `E`/`H` pairs are a caller bug: lookups may miss but the
//!   table stays memory safe.
//! - Iterators borrow the table, so it cannot be changed structurally while
//!   one is alive. `iter_mut` visits entries in the same bucket order.

mod bucket_array;
mod chained_hash_map;
mod chained_hash_map_proptest;
pub mod hash;
pub mod iter;
pub mod policy;

// Public surface
#[cfg(feature = "stats")]
pub use chained_hash_map::ChainStats;
pub use chained_hash_map::{
    ChainedHashMap, StdChainedHashMap, StdEq, StdHash, DEFAULT_CAPACITY,
};
pub use policy::ResizePolicy;
