#![cfg(test)]

// Property tests for HashTable, kept inside the crate next to the
// implementation so they can check internal counters against a model.

use crate::callbacks::{compare_direct, hash_handle, Callbacks};
use crate::config::TableConfig;
use crate::hash_table::HashTable;
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

// Pool-indexed operations: indices shrink toward earlier keys, the pool
// shrinks in length and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Set(usize, u32),
    Steal(usize),
    Delete(usize),
    Get(usize),
    Clear,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<usize>, Vec<Op>)> {
    proptest::collection::vec(any::<usize>(), 1..=40).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            6 => (idx.clone(), any::<u32>()).prop_map(|(i, v)| Op::Set(i, v)),
            2 => idx.clone().prop_map(Op::Steal),
            2 => idx.clone().prop_map(Op::Delete),
            3 => idx.clone().prop_map(Op::Get),
            1 => Just(Op::Clear),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..200).prop_map(move |ops| (pool.clone(), ops))
    })
}

type Released = Rc<RefCell<BTreeMap<u32, usize>>>;

// Values released through `free_value`, counted per value.
fn tracked(hash: fn(&usize) -> u64) -> (HashTable<usize, u32>, Released) {
    let released: Released = Rc::new(RefCell::new(BTreeMap::new()));
    let log = released.clone();
    let callbacks = Callbacks::new(hash, compare_direct).free_value(move |v| {
        *log.borrow_mut().entry(v).or_insert(0) += 1;
    });
    let table = HashTable::with_config(TableConfig::default(), callbacks).unwrap();
    (table, released)
}

fn run_scenario(
    hash: fn(&usize) -> u64,
    pool: Vec<usize>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let (mut sut, released) = tracked(hash);
    let mut model: HashMap<usize, u32> = HashMap::new();
    let mut expected_released: BTreeMap<u32, usize> = BTreeMap::new();

    for op in ops {
        match op {
            Op::Set(i, v) => {
                let k = pool[i];
                let prev = sut.set(k, v).unwrap();
                prop_assert_eq!(prev, model.insert(k, v));
            }
            Op::Steal(i) => {
                let k = pool[i];
                prop_assert_eq!(sut.steal(&k), model.remove(&k));
                prop_assert!(sut.get(&k).is_none());
            }
            Op::Delete(i) => {
                let k = pool[i];
                let removed = model.remove(&k);
                prop_assert_eq!(sut.delete(&k), removed.is_some());
                if let Some(v) = removed {
                    *expected_released.entry(v).or_insert(0) += 1;
                }
            }
            Op::Get(i) => {
                let k = pool[i];
                prop_assert_eq!(sut.get(&k), model.get(&k));
                prop_assert_eq!(sut.contains_key(&k), model.contains_key(&k));
                if let Some(e) = sut.get_entry(&k) {
                    prop_assert_eq!(*e.key(), k);
                    prop_assert_eq!(e.hash(), hash(&k));
                }
            }
            Op::Clear => {
                let cap = sut.capacity();
                sut.clear();
                for v in model.drain().map(|(_, v)| v) {
                    *expected_released.entry(v).or_insert(0) += 1;
                }
                prop_assert_eq!(sut.capacity(), cap);
            }
            Op::Iterate => {
                let mut seen = BTreeSet::new();
                let walked: Result<(), ()> = sut.foreach(|k, v| {
                    assert!(seen.insert(*k), "key visited twice");
                    assert_eq!(model.get(k), Some(v));
                    Ok(())
                });
                prop_assert!(walked.is_ok());
                let keys: BTreeSet<usize> = model.keys().copied().collect();
                prop_assert_eq!(seen, keys);
            }
        }

        // Structural invariants after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.iter().len(), model.len());
        prop_assert!(sut.len() <= sut.used());
        prop_assert!(sut.used() <= sut.config().threshold(sut.capacity()));
        prop_assert!(sut.capacity().is_power_of_two());
        prop_assert_eq!(&*released.borrow(), &expected_released);
    }

    // Dropping the table releases whatever is still live.
    for v in model.values() {
        *expected_released.entry(*v).or_insert(0) += 1;
    }
    drop(sut);
    prop_assert_eq!(&*released.borrow(), &expected_released);
    Ok(())
}

fn handle_hash(k: &usize) -> u64 {
    hash_handle(*k)
}

// Every key lands on the same probe path.
fn constant_hash(_: &usize) -> u64 {
    0
}

// Property: state-machine equivalence against std::collections::HashMap.
// - `set` returns the previously bound value, last write wins.
// - `steal`/`delete` remove exactly the model's binding; `delete`, `clear`
//   and drop release each value exactly once, `steal` releases none.
// - `foreach` visits each live key once with its model value.
// - `count <= used <= threshold(capacity)` after every op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(handle_hash, pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(constant_hash, pool, ops)?;
    }

    // Property: distinct keys are all retrievable after any number of
    // rehashes, and repeating a `set` does not change observable state.
    #[test]
    fn prop_distinct_keys_survive_rehash(keys in proptest::collection::btree_set(any::<usize>(), 0..500)) {
        let (mut t, _) = tracked(handle_hash);
        for (i, k) in keys.iter().enumerate() {
            t.set(*k, i as u32).unwrap();
        }
        let (len, used, cap) = (t.len(), t.used(), t.capacity());
        for (i, k) in keys.iter().enumerate() {
            prop_assert_eq!(t.set(*k, i as u32).unwrap(), Some(i as u32));
        }
        prop_assert_eq!((t.len(), t.used(), t.capacity()), (len, used, cap));
        prop_assert_eq!(t.len(), keys.len());
        for (i, k) in keys.iter().enumerate() {
            prop_assert_eq!(t.get(k), Some(&(i as u32)));
        }
    }
}
