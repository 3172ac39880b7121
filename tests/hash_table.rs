// HashTable integration suite.
//
// Each test documents the behavior it verifies through the public API. The
// core invariants exercised:
// - Bindings: `get` returns the last value `set` for a key; `len` counts
//   distinct live keys.
// - Removal: `steal` hands the value back and leaves the key absent.
// - Rehash: growth preserves every binding.
// - Clear: empties the table without giving up capacity; the table stays
//   usable afterward.
// - Enumeration: `foreach`/`iter` visit each live entry exactly once.
// - Ownership: release callbacks run exactly where documented.
use probe_table::{
    compare_direct, hash_handle, hash_ptr, Callbacks, HashTable, TableConfig, TableError,
};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;

fn hash_char(key: &char) -> u64 {
    *key as u64
}

fn value_of(key: char) -> usize {
    1 + (key as usize - 'a' as usize)
}

// Test: the alphabet walk-through.
// Verifies: set/get_entry/get/steal/foreach/clear on keys 'a'..='z'
// mapped to 1..=26.
#[test]
fn alphabet_scenario() {
    let mut table: HashTable<char, usize> = HashTable::new(hash_char, compare_direct).unwrap();
    assert_eq!(table.len(), 0);
    assert!(table.capacity() > 0);
    assert!(table.get(&'x').is_none());

    for key in 'a'..='z' {
        assert_eq!(table.set(key, value_of(key)).unwrap(), None);
    }
    assert_eq!(table.len(), 26);
    assert!(table.capacity() > table.len());

    for key in 'a'..='z' {
        let entry = table.get_entry(&key).expect("entry present");
        assert_eq!(*entry.key(), key);
        assert_eq!(*entry.value(), value_of(key));
    }
    for key in 'a'..='z' {
        assert_eq!(table.get(&key), Some(&value_of(key)));
    }

    assert_eq!(table.steal(&'p'), Some(16));
    assert_eq!(table.len(), 25);
    assert!(table.get_entry(&'p').is_none());
    assert!(table.get(&'p').is_none());

    let mut count = 0;
    let res: Result<(), ()> = table.foreach(|key, value| {
        assert_eq!(*value, value_of(*key));
        count += 1;
        Ok(())
    });
    assert_eq!(res, Ok(()));
    assert_eq!(count, 25);

    table.clear();
    assert_eq!(table.len(), 0);
    assert!(table.capacity() > 0);
    assert!(table.get(&'x').is_none());

    table.destroy();
}

// Test: distinct keys.
// Verifies: `len` equals the number of distinct keys and each key maps to
// its most recent value, across several rehashes.
#[test]
fn distinct_keys_survive_multiple_rehashes() {
    let mut table: HashTable<usize, usize> =
        HashTable::new(|k: &usize| hash_handle(*k), compare_direct).unwrap();
    let initial = table.capacity();
    for k in 0..10_000 {
        table.set(k * 16, k).unwrap();
    }
    for k in (0..10_000).step_by(3) {
        table.set(k * 16, k + 1).unwrap();
    }
    assert!(table.capacity() >= initial * 4, "expected at least two rehashes");
    assert_eq!(table.len(), 10_000);
    for k in 0..10_000 {
        let expected = if k % 3 == 0 { k + 1 } else { k };
        assert_eq!(table.get(&(k * 16)), Some(&expected));
    }
}

// Test: set is idempotent.
// Verifies: a repeated identical `set` leaves len, used, capacity and the
// enumerated contents unchanged.
#[test]
fn repeated_set_is_idempotent() {
    let mut table: HashTable<char, usize> = HashTable::new(hash_char, compare_direct).unwrap();
    table.set('k', 1).unwrap();
    let before = (table.len(), table.used(), table.capacity());
    let entries_before: Vec<_> = table.iter().map(|(k, v)| (*k, *v)).collect();

    assert_eq!(table.set('k', 1).unwrap(), Some(1));
    assert_eq!((table.len(), table.used(), table.capacity()), before);
    let entries_after: Vec<_> = table.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(entries_before, entries_after);
}

// Test: set then steal.
// Verifies: steal returns the value, afterwards the key is absent and a
// second steal is a no-op.
#[test]
fn set_then_steal_round_trip() {
    let mut table: HashTable<char, usize> = HashTable::new(hash_char, compare_direct).unwrap();
    table.set('q', 7).unwrap();
    assert_eq!(table.steal(&'q'), Some(7));
    assert!(table.get(&'q').is_none());
    assert_eq!(table.steal(&'q'), None);
    assert!(table.is_empty());
}

// Test: clear keeps the table usable.
// Verifies: keys are gone after clear; new bindings work; capacity kept.
#[test]
fn clear_then_reuse() {
    let mut table: HashTable<usize, usize> =
        HashTable::new(|k: &usize| hash_handle(*k), compare_direct).unwrap();
    for k in 0..100 {
        table.set(k, k).unwrap();
    }
    let cap = table.capacity();
    table.clear();
    assert_eq!(table.capacity(), cap);
    assert_eq!(table.used(), 0);
    for k in 0..100 {
        assert!(table.get(&k).is_none());
    }
    table.set(5, 50).unwrap();
    assert_eq!(table.get(&5), Some(&50));
    assert_eq!(table.len(), 1);
}

// Test: enumeration.
// Verifies: foreach and iter visit exactly the live keys once each, after a
// mix of inserts and steals.
#[test]
fn enumeration_visits_each_live_entry_once() {
    let mut table: HashTable<usize, usize> =
        HashTable::new(|k: &usize| hash_handle(*k), compare_direct).unwrap();
    for k in 0..300 {
        table.set(k, k * 2).unwrap();
    }
    for k in (0..300).filter(|k| k % 4 == 0) {
        assert_eq!(table.steal(&k), Some(k * 2));
    }

    let mut seen = HashSet::new();
    table
        .foreach(|k, v| {
            assert_eq!(*v, k * 2);
            if seen.insert(*k) {
                Ok(())
            } else {
                Err(*k)
            }
        })
        .expect("no key visited twice");
    let expected: HashSet<usize> = (0..300).filter(|k| k % 4 != 0).collect();
    assert_eq!(seen, expected);
    assert_eq!(table.iter().len(), expected.len());
    assert_eq!((&table).into_iter().count(), expected.len());
}

// Test: status-style abort.
// Verifies: a non-zero status stops the walk and is reported verbatim.
#[test]
fn foreach_status_propagates_abort() {
    let mut table: HashTable<char, usize> = HashTable::new(hash_char, compare_direct).unwrap();
    for key in 'a'..='e' {
        table.set(key, value_of(key)).unwrap();
    }
    let mut calls = 0;
    let res = table.foreach_status(|_, _| {
        calls += 1;
        if calls == 2 {
            42
        } else {
            0
        }
    });
    assert_eq!(res, Err(TableError::CallbackAbort { status: 42 }));
    assert_eq!(calls, 2);
}

// Test: overwrite ownership.
// Assumes: overwriting is "last write wins" and hands the old value back.
// Verifies: no release callback runs for either the old value or the
// incoming key; the stored key is kept.
#[test]
fn overwrite_hands_back_old_value_without_release() {
    let freed = Rc::new(RefCell::new(Vec::new()));
    let (fk, fv) = (freed.clone(), freed.clone());
    let mut table: HashTable<usize, usize> = HashTable::new_full(
        |k: &usize| hash_handle(*k),
        compare_direct,
        move |k| fk.borrow_mut().push(("key", k)),
        move |v| fv.borrow_mut().push(("value", v)),
    )
    .unwrap();

    table.set(1, 100).unwrap();
    assert_eq!(table.set(1, 200).unwrap(), Some(100));
    assert!(freed.borrow().is_empty());
    assert_eq!(table.get(&1), Some(&200));

    table.destroy();
    assert_eq!(*freed.borrow(), vec![("key", 1), ("value", 200)]);
}

// Test: pointer handles.
// Verifies: boxed payloads can be keyed by address; the table never touches
// the pointee and the caller frees what it stole.
#[test]
fn pointer_handles_keyed_by_address() {
    let payloads: Vec<Box<String>> = (0..50).map(|i| Box::new(format!("p{i}"))).collect();
    let mut table: HashTable<*const String, usize> =
        HashTable::new(|p: &*const String| hash_ptr(*p), compare_direct).unwrap();
    for (i, b) in payloads.iter().enumerate() {
        table.set(&**b as *const String, i).unwrap();
    }
    for (i, b) in payloads.iter().enumerate() {
        assert_eq!(table.get(&(&**b as *const String)), Some(&i));
    }
    let unrelated = String::from("p0");
    assert!(table.get(&(&unrelated as *const String)).is_none());
}

// Test: owned release.
// Verifies: delete releases both halves; drop releases the rest once.
#[test]
fn delete_and_drop_release_through_callbacks() {
    let keys = Rc::new(RefCell::new(BTreeSet::new()));
    let values = Rc::new(RefCell::new(BTreeSet::new()));
    let (kl, vl) = (keys.clone(), values.clone());
    let callbacks = Callbacks::new(|k: &usize| hash_handle(*k), compare_direct)
        .free_key(move |k| assert!(kl.borrow_mut().insert(k)))
        .free_value(move |v: usize| assert!(vl.borrow_mut().insert(v)));
    let mut table = HashTable::with_config(TableConfig::default(), callbacks).unwrap();

    for k in 0..10 {
        table.set(k, k + 1000).unwrap();
    }
    assert!(table.delete(&3));
    assert_eq!(*keys.borrow(), BTreeSet::from([3]));
    assert_eq!(*values.borrow(), BTreeSet::from([1003]));

    drop(table);
    assert_eq!(keys.borrow().len(), 10);
    assert_eq!(values.borrow().len(), 10);
}

// Test: configuration.
// Verifies: invalid load factors are rejected up front; a custom initial
// capacity is honored and rounded to a power of two.
#[test]
fn config_validation_and_initial_capacity() {
    let bad = TableConfig::new().max_load_factor(1.0);
    let err = HashTable::<usize, usize>::with_config(
        bad,
        Callbacks::new(|k: &usize| hash_handle(*k), compare_direct),
    )
    .unwrap_err();
    assert!(matches!(err, TableError::InvalidConfig { .. }));

    let table = HashTable::<usize, usize>::with_config(
        TableConfig::new().initial_capacity(100),
        Callbacks::new(|k: &usize| hash_handle(*k), compare_direct),
    )
    .unwrap();
    assert_eq!(table.capacity(), 128);
}

// Test: shrink can be disabled.
// Verifies: with `shrink_on_steal(false)` capacity never drops on removal.
#[test]
fn shrink_disabled_keeps_capacity() {
    let mut table = HashTable::<usize, usize>::with_config(
        TableConfig::new().shrink_on_steal(false),
        Callbacks::new(|k: &usize| hash_handle(*k), compare_direct),
    )
    .unwrap();
    for k in 0..500 {
        table.set(k, k).unwrap();
    }
    let cap = table.capacity();
    for k in 0..500 {
        table.steal(&k).unwrap();
    }
    assert!(table.is_empty());
    assert_eq!(table.capacity(), cap);
}

// Test: construction that cannot allocate.
// Verifies: an oversized initial capacity is reported as OutOfMemory rather
// than aborting.
#[test]
fn oversized_initial_capacity_is_out_of_memory() {
    let huge = 1usize << (usize::BITS - 4);
    let err = HashTable::<usize, usize>::with_config(
        TableConfig::new().initial_capacity(huge),
        Callbacks::new(|k: &usize| hash_handle(*k), compare_direct),
    )
    .unwrap_err();
    assert_eq!(err, TableError::OutOfMemory { slots: huge });
}

// Test: a load factor that can never hold an entry.
// Verifies: rejected as InvalidConfig up front instead of failing every set.
#[test]
fn vanishing_load_factor_is_invalid_config() {
    let err = HashTable::<usize, usize>::with_config(
        TableConfig::new().max_load_factor(1e-300).min_load_factor(0.0),
        Callbacks::new(|k: &usize| hash_handle(*k), compare_direct),
    )
    .unwrap_err();
    assert!(matches!(err, TableError::InvalidConfig { .. }));
}

// Test: caller-driven delete.
// Assumes: a full delete is `steal` followed by the caller releasing key and
// value itself.
// Verifies: `steal` runs neither release callback, so the caller's release
// is the only one; drop later releases only the entries still present.
#[test]
fn steal_then_caller_release_releases_once() {
    let freed = Rc::new(RefCell::new(Vec::new()));
    let (fk, fv) = (freed.clone(), freed.clone());
    let mut table: HashTable<usize, usize> = HashTable::new_full(
        |k: &usize| hash_handle(*k),
        compare_direct,
        move |k| fk.borrow_mut().push(("key", k)),
        move |v| fv.borrow_mut().push(("value", v)),
    )
    .unwrap();
    table.set(0x40, 1).unwrap();
    table.set(0x50, 2).unwrap();

    let value = table.steal(&0x40).expect("present");
    assert_eq!(value, 1);
    assert!(freed.borrow().is_empty());
    freed.borrow_mut().push(("key", 0x40));
    freed.borrow_mut().push(("value", value));

    drop(table);
    assert_eq!(
        *freed.borrow(),
        vec![("key", 0x40), ("value", 1), ("key", 0x50), ("value", 2)]
    );
}
