//! BucketArray: chain heads plus an arena of singly linked entries.
//!
//! Each bucket is the arena key of its chain head; each entry carries the
//! key of the next entry in its chain. Entries never move in the arena, so
//! growing the table only rewrites the head array and the `next` links.

use slotmap::{DefaultKey, SecondaryMap, SlotMap};

/// Link to the next entry of a chain, `None` at the end.
pub(crate) type Link = Option<DefaultKey>;

#[derive(Clone, Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u32,
    next: Link,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(key: K, value: V, hash: u32) -> Self {
        Self {
            key,
            value,
            hash,
            next: None,
        }
    }
}

/// Bucket that an entry with `hash` belongs to in a table of `capacity` buckets.
#[inline]
pub(crate) fn bucket_index(hash: u32, capacity: usize) -> usize {
    debug_assert!(capacity > 0);
    (u64::from(hash) % capacity as u64) as usize
}

#[derive(Clone, Debug)]
pub(crate) struct BucketArray<K, V> {
    heads: Vec<Link>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
}

impl<K, V> BucketArray<K, V> {
    /// Allocate `capacity` empty chains; zero is clamped to one.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            heads: vec![None; capacity.max(1)],
            slots: SlotMap::with_key(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.heads.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn chain_at(&self, index: usize) -> Chain<'_, K, V> {
        Chain {
            slots: &self.slots,
            cursor: self.heads[index],
        }
    }

    /// Every bucket by ascending index, each paired with its chain.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, Chain<'_, K, V>)> + '_ {
        self.heads.iter().enumerate().map(move |(i, &head)| {
            (
                i,
                Chain {
                    slots: &self.slots,
                    cursor: head,
                },
            )
        })
    }

    /// Every entry with a mutable value, in the same order as [`iter`](Self::iter).
    ///
    /// Chains link through the arena, so the walk ranks each entry by its
    /// bucket position first and then hands out the arena's disjoint borrows
    /// in rank order.
    pub(crate) fn ordered_mut(&mut self) -> Vec<(&K, &mut V)> {
        let mut rank: SecondaryMap<DefaultKey, usize> =
            SecondaryMap::with_capacity(self.slots.len());
        let mut linked = 0usize;
        for (_, chain) in self.iter() {
            for (k, _) in chain {
                rank.insert(k, linked);
                linked += 1;
            }
        }
        let mut out: Vec<Option<(&K, &mut V)>> = Vec::new();
        out.resize_with(linked, || None);
        for (k, entry) in self.slots.iter_mut() {
            if let Some(&r) = rank.get(k) {
                out[r] = Some((&entry.key, &mut entry.value));
            }
        }
        out.into_iter().flatten().collect()
    }

    pub(crate) fn find<P>(&self, index: usize, mut pred: P) -> Option<&Entry<K, V>>
    where
        P: FnMut(&Entry<K, V>) -> bool,
    {
        self.chain_at(index).map(|(_, e)| e).find(|&e| pred(e))
    }

    pub(crate) fn find_mut<P>(&mut self, index: usize, mut pred: P) -> Option<&mut Entry<K, V>>
    where
        P: FnMut(&Entry<K, V>) -> bool,
    {
        let found = self
            .chain_at(index)
            .find(|&(_, e)| pred(e))
            .map(|(k, _)| k)?;
        self.slots.get_mut(found)
    }

    /// Link `entry` at the head of the chain at `index`.
    pub(crate) fn link_front(&mut self, index: usize, entry: Entry<K, V>) {
        let next = self.heads[index];
        let k = self.slots.insert(Entry { next, ..entry });
        self.heads[index] = Some(k);
    }

    /// Unlink the first entry of chain `index` matching `pred` and hand it back.
    pub(crate) fn unlink<P>(&mut self, index: usize, mut pred: P) -> Option<Entry<K, V>>
    where
        P: FnMut(&Entry<K, V>) -> bool,
    {
        let mut prev: Link = None;
        let mut cursor = self.heads[index];
        while let Some(k) = cursor {
            let entry = self.slots.get(k)?;
            let next = entry.next;
            if pred(entry) {
                match prev {
                    None => self.heads[index] = next,
                    Some(p) => self.slots.get_mut(p)?.next = next,
                }
                return self.slots.remove(k);
            }
            prev = cursor;
            cursor = next;
        }
        None
    }

    /// Swap in `new_capacity` empty chains and re-home every entry by its
    /// cached hash, linking at the head as a normal insert does.
    pub(crate) fn relink(&mut self, new_capacity: usize) {
        let new_capacity = new_capacity.max(1);
        let old = std::mem::replace(&mut self.heads, vec![None; new_capacity]);
        for head in old {
            let mut cursor = head;
            while let Some(k) = cursor {
                let Some(entry) = self.slots.get_mut(k) else {
                    break;
                };
                cursor = entry.next;
                let i = bucket_index(entry.hash, new_capacity);
                entry.next = self.heads[i];
                self.heads[i] = Some(k);
            }
        }
    }

    /// Drop every entry; the number of buckets is left as is.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.heads.fill(None);
    }

    #[cfg(any(test, feature = "stats"))]
    pub(crate) fn chain_lengths(&self) -> impl Iterator<Item = usize> + '_ {
        self.iter().map(|(_, chain)| chain.count())
    }

    /// Every entry sits in the bucket its cached hash selects and the chains
    /// account for exactly the live entries.
    pub(crate) fn is_consistent(&self) -> bool {
        let capacity = self.capacity();
        let mut linked = 0usize;
        for (i, chain) in self.iter() {
            for (_, entry) in chain {
                linked += 1;
                // A cycle would walk past the number of live entries.
                if linked > self.slots.len() || bucket_index(entry.hash, capacity) != i {
                    return false;
                }
            }
        }
        linked == self.slots.len()
    }
}

/// Walks one chain from its head, yielding arena keys with their entries.
pub(crate) struct Chain<'a, K, V> {
    slots: &'a SlotMap<DefaultKey, Entry<K, V>>,
    cursor: Link,
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = (DefaultKey, &'a Entry<K, V>);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cursor?;
        let entry = self.slots.get(k)?;
        self.cursor = entry.next;
        Some((k, entry))
    }
}
