//! Resize policy: when a table grows and by how much.

/// Default maximum load factor, as `numerator / denominator`.
pub const DEFAULT_LOAD_FACTOR: (usize, usize) = (3, 4);

/// Default minimum number of buckets added per growth step.
pub const DEFAULT_MIN_GROWTH: usize = 4;

/// Growth trigger and step size for a [`ChainedHashMap`](crate::ChainedHashMap).
///
/// The table grows once `len / capacity` exceeds the load factor. Each
/// growth step at least doubles the bucket count and adds at least
/// `min_growth` buckets. Capacity never shrinks.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ResizePolicy {
    load_numerator: usize,
    load_denominator: usize,
    min_growth: usize,
}

impl ResizePolicy {
    /// Zero components are clamped to one.
    pub const fn new(load_numerator: usize, load_denominator: usize, min_growth: usize) -> Self {
        Self {
            load_numerator: if load_numerator == 0 { 1 } else { load_numerator },
            load_denominator: if load_denominator == 0 { 1 } else { load_denominator },
            min_growth: if min_growth == 0 { 1 } else { min_growth },
        }
    }

    pub fn load_factor(&self) -> (usize, usize) {
        (self.load_numerator, self.load_denominator)
    }

    pub fn min_growth(&self) -> usize {
        self.min_growth
    }

    /// True when `len` entries over `capacity` buckets exceed the load factor.
    #[inline]
    pub fn should_grow(&self, len: usize, capacity: usize) -> bool {
        (len as u128) * (self.load_denominator as u128)
            > (capacity as u128) * (self.load_numerator as u128)
    }

    /// Next capacity after `capacity`. Saturates at `usize::MAX`.
    #[inline]
    pub fn next_capacity(&self, capacity: usize) -> usize {
        capacity
            .saturating_mul(2)
            .max(capacity.saturating_add(self.min_growth))
    }

    /// Smallest capacity reachable from `capacity` by growth steps that
    /// holds `len` entries without exceeding the load factor.
    pub fn grown_capacity(&self, len: usize, capacity: usize) -> usize {
        let mut capacity = capacity.max(1);
        while self.should_grow(len, capacity) {
            let next = self.next_capacity(capacity);
            if next == capacity {
                break;
            }
            capacity = next;
        }
        capacity
    }
}

impl Default for ResizePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_LOAD_FACTOR.0, DEFAULT_LOAD_FACTOR.1, DEFAULT_MIN_GROWTH)
    }
}
