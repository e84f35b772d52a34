#![cfg(test)]

// Property tests for ChainedHashMap kept inside the crate so they can check
// the bucket layout directly.

use crate::chained_hash_map::ChainedHashMap;
use crate::hash::text_hash;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, i32),
    Replace(usize, i32),
    Delete(usize),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Clear,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Put(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Replace(i, v)),
            1 => idx.clone().prop_map(OpI::Delete),
            1 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Drive one table and a std HashMap model through the same operations.
//
// Invariants checked after every op:
// - `get`/`contains_key` agree with the model; `replace`/`remove` return the
//   model's previous value.
// - `len` equals the number of distinct live keys.
// - Every entry sits in the bucket its cached hash selects.
// - Capacity never decreases.
fn run_state_machine<H>(
    hash: H,
    initial_capacity: usize,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    H: Fn(&String) -> u32,
{
    let mut sut = ChainedHashMap::new(initial_capacity, |a: &String, b: &String| a == b, hash);
    let mut model: HashMap<String, i32> = HashMap::new();
    let mut capacity = sut.capacity();

    for op in ops {
        match op {
            OpI::Put(i, v) => {
                sut.put(pool[i].clone(), v);
                model.insert(pool[i].clone(), v);
            }
            OpI::Replace(i, v) => {
                let prev = sut.replace(pool[i].clone(), v);
                prop_assert_eq!(prev, model.insert(pool[i].clone(), v));
            }
            OpI::Delete(i) => {
                sut.delete(&pool[i]);
                model.remove(&pool[i]);
                prop_assert!(sut.get(&pool[i]).is_none());
            }
            OpI::Remove(i) => {
                prop_assert_eq!(sut.remove(&pool[i]), model.remove(&pool[i]));
            }
            OpI::Get(i) => {
                prop_assert_eq!(sut.get(&pool[i]), model.get(&pool[i]));
            }
            OpI::Contains(s) => {
                prop_assert_eq!(sut.contains_key(&s), model.contains_key(&s));
            }
            OpI::Mutate(i, d) => {
                if let Some(v) = sut.get_mut(&pool[i]) {
                    *v = v.saturating_add(d);
                    let mv = model.get_mut(&pool[i]).expect("present in model");
                    *mv = mv.saturating_add(d);
                } else {
                    prop_assert!(!model.contains_key(&pool[i]));
                }
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
            }
            OpI::Iterate => {
                let s: BTreeMap<_, _> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let m: BTreeMap<_, _> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(s.len(), sut.len(), "iteration yields each entry once");
                prop_assert_eq!(s, m);
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.capacity() >= capacity, "capacity shrank");
        capacity = sut.capacity();
        prop_assert!(sut.is_consistent());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario(), cap in 0usize..6) {
        run_state_machine(|k: &String| text_hash(k), cap, &pool, ops)?;
    }

    // Worst case: every key lands in one chain.
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario(), cap in 0usize..6) {
        run_state_machine(|_: &String| 0, cap, &pool, ops)?;
    }

    // Few distinct hashes: short keys share buckets across resizes.
    #[test]
    fn prop_state_machine_with_banded_hash((pool, ops) in arb_scenario(), cap in 0usize..6) {
        run_state_machine(|k: &String| k.len() as u32, cap, &pool, ops)?;
    }
}

proptest! {
    // Iteration order is bucket by bucket: the bucket of each yielded key
    // never decreases.
    #[test]
    fn prop_iteration_is_bucket_ordered(keys in proptest::collection::vec(any::<u32>(), 0..200)) {
        let mut m = ChainedHashMap::new(1, |a: &u32, b: &u32| a == b, |k: &u32| *k);
        for &k in &keys {
            m.put(k, ());
        }
        let cap = m.capacity() as u64;
        let buckets: Vec<u64> = m.keys().map(|&k| u64::from(k) % cap).collect();
        prop_assert!(buckets.windows(2).all(|w| w[0] <= w[1]));
        let distinct: BTreeSet<u32> = keys.iter().copied().collect();
        prop_assert_eq!(m.len(), distinct.len());
    }
}
