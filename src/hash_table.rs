//! HashTable: open-addressing table over caller-owned handles.
//!
//! Slots form a power-of-two array probed linearly from `hash & mask`.
//! Removal leaves a tombstone so later probes keep walking past it; tombstones
//! are reused by inserts and discarded by the next rehash.

use crate::callbacks::Callbacks;
use crate::config::TableConfig;
use crate::error::{Result, TableError};
use crate::reentrancy::CallbackGuard;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use tracing::{debug, trace};

struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
}

enum Slot<K, V> {
    Empty,
    Tombstone,
    Occupied(Entry<K, V>),
}

/// Outcome of walking the probe sequence for an insert.
enum Probe {
    Found(usize),
    /// First tombstone on the path; reusing it does not change `used`.
    Tombstone(usize),
    Empty(usize),
    /// Every slot visited without a match or a free slot.
    Exhausted,
}

/// Borrowed view of an occupied slot.
pub struct EntryRef<'a, K, V> {
    entry: &'a Entry<K, V>,
}

impl<'a, K, V> EntryRef<'a, K, V> {
    pub fn key(&self) -> &'a K {
        &self.entry.key
    }

    pub fn value(&self) -> &'a V {
        &self.entry.value
    }

    /// The hash computed when the entry was inserted.
    pub fn hash(&self) -> u64 {
        self.entry.hash
    }
}

impl<K, V> Clone for EntryRef<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for EntryRef<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for EntryRef<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryRef")
            .field("key", &self.entry.key)
            .field("value", &self.entry.value)
            .field("hash", &self.entry.hash)
            .finish()
    }
}

pub struct HashTable<K, V> {
    slots: Vec<Slot<K, V>>,
    /// Live entries.
    count: usize,
    /// Live entries plus tombstones.
    used: usize,
    config: TableConfig,
    callbacks: Callbacks<K, V>,
    guard: CallbackGuard,
}

/// Iterator over occupied slots in storage order.
pub struct Iter<'a, K, V> {
    slots: core::slice::Iter<'a, Slot<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Slot::Occupied(e) = slot {
                self.remaining -= 1;
                return Some((&e.key, &e.value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a HashTable<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn alloc_slots<K, V>(capacity: usize) -> Result<Vec<Slot<K, V>>> {
    let mut slots = Vec::new();
    if slots.try_reserve_exact(capacity).is_err() {
        trace!(capacity, "slot array allocation failed");
        return Err(TableError::OutOfMemory { slots: capacity });
    }
    slots.resize_with(capacity, || Slot::Empty);
    Ok(slots)
}

/// First empty slot on the probe path of `hash`. Only used on arrays without
/// tombstones and with at least one empty slot, so the walk terminates.
fn first_empty<K, V>(slots: &[Slot<K, V>], hash: u64) -> usize {
    let mask = slots.len() - 1;
    let mut idx = hash as usize & mask;
    while !matches!(slots[idx], Slot::Empty) {
        idx = (idx + 1) & mask;
    }
    idx
}

impl<K, V> HashTable<K, V> {
    /// Create an empty table with the default configuration.
    pub fn new<H, E>(hash: H, equal: E) -> Result<Self>
    where
        H: Fn(&K) -> u64 + 'static,
        E: Fn(&K, &K) -> bool + 'static,
    {
        Self::with_config(TableConfig::default(), Callbacks::new(hash, equal))
    }

    /// Like [`new`](Self::new), with release callbacks invoked whenever the
    /// table disposes of a key or value it owns.
    pub fn new_full<H, E, FK, FV>(hash: H, equal: E, free_key: FK, free_value: FV) -> Result<Self>
    where
        H: Fn(&K) -> u64 + 'static,
        E: Fn(&K, &K) -> bool + 'static,
        FK: FnMut(K) + 'static,
        FV: FnMut(V) + 'static,
    {
        let callbacks = Callbacks::new(hash, equal)
            .free_key(free_key)
            .free_value(free_value);
        Self::with_config(TableConfig::default(), callbacks)
    }

    pub fn with_config(config: TableConfig, callbacks: Callbacks<K, V>) -> Result<Self> {
        config.validate()?;
        let slots = alloc_slots(config.min_capacity())?;
        Ok(Self {
            slots,
            count: 0,
            used: 0,
            config,
            callbacks,
            guard: CallbackGuard::default(),
        })
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live entries plus tombstones.
    pub fn used(&self) -> usize {
        self.used
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Bytes owned by the table: the header plus the slot array. Memory
    /// behind the handles is not counted.
    pub fn memory_size(&self) -> usize {
        mem::size_of::<Self>() + self.slots.capacity() * mem::size_of::<Slot<K, V>>()
    }

    fn lookup(&self, hash: u64, key: &K) -> Option<usize> {
        let mask = self.slots.len() - 1;
        let mut idx = hash as usize & mask;
        for _ in 0..self.slots.len() {
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Occupied(e) => {
                    if e.hash == hash && (self.callbacks.equal)(key, &e.key) {
                        return Some(idx);
                    }
                }
            }
            idx = (idx + 1) & mask;
        }
        None
    }

    fn probe_insert(&self, hash: u64, key: &K) -> Probe {
        let mask = self.slots.len() - 1;
        let mut idx = hash as usize & mask;
        let mut tombstone = None;
        for _ in 0..self.slots.len() {
            match &self.slots[idx] {
                Slot::Empty => {
                    return match tombstone {
                        Some(t) => Probe::Tombstone(t),
                        None => Probe::Empty(idx),
                    };
                }
                Slot::Tombstone => {
                    tombstone.get_or_insert(idx);
                }
                Slot::Occupied(e) => {
                    if e.hash == hash && (self.callbacks.equal)(key, &e.key) {
                        return Probe::Found(idx);
                    }
                }
            }
            idx = (idx + 1) & mask;
        }
        match tombstone {
            Some(t) => Probe::Tombstone(t),
            None => Probe::Exhausted,
        }
    }

    fn find_index(&self, key: &K) -> Option<usize> {
        let _s = self.guard.enter();
        let hash = (self.callbacks.hash)(key);
        self.lookup(hash, key)
    }

    pub fn get_entry(&self, key: &K) -> Option<EntryRef<'_, K, V>> {
        let idx = self.find_index(key)?;
        match &self.slots[idx] {
            Slot::Occupied(entry) => Some(EntryRef { entry }),
            _ => None,
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_entry(key).map(|e| e.value())
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let idx = self.find_index(key)?;
        match &mut self.slots[idx] {
            Slot::Occupied(e) => Some(&mut e.value),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find_index(key).is_some()
    }

    /// Bind `key` to `value`.
    ///
    /// If an equal key is already present its value is replaced and the
    /// previous value is handed back; the stored key is kept and `key` is
    /// dropped. No release callback runs on this path.
    ///
    /// On `OutOfMemory` the table is unchanged and `key`/`value` are dropped
    /// without release callbacks.
    pub fn set(&mut self, key: K, value: V) -> Result<Option<V>> {
        let (hash, probe) = {
            let _s = self.guard.enter();
            let hash = (self.callbacks.hash)(&key);
            (hash, self.probe_insert(hash, &key))
        };

        let idx = match probe {
            Probe::Found(idx) => {
                return match &mut self.slots[idx] {
                    Slot::Occupied(e) => Ok(Some(mem::replace(&mut e.value, value))),
                    _ => Ok(None),
                };
            }
            Probe::Tombstone(idx) => idx,
            Probe::Empty(idx) if self.used < self.config.threshold(self.capacity()) => idx,
            Probe::Empty(_) | Probe::Exhausted => {
                self.grow()?;
                first_empty(&self.slots, hash)
            }
        };

        if matches!(self.slots[idx], Slot::Empty) {
            self.used += 1;
        }
        self.slots[idx] = Slot::Occupied(Entry { key, value, hash });
        self.count += 1;
        Ok(None)
    }

    /// Rehash so that one more entry fits with headroom. Never shrinks; with
    /// enough tombstones this rebuilds at the current capacity.
    fn grow(&mut self) -> Result<()> {
        let wanted = self.count.saturating_add(1).saturating_mul(2);
        let target = self
            .config
            .capacity_for(wanted)
            .ok_or(TableError::OutOfMemory { slots: usize::MAX })?;
        self.rehash(target.max(self.capacity()))
    }

    /// Move every live entry into a fresh array of `capacity` slots, reusing
    /// the cached hashes. Tombstones are dropped.
    fn rehash(&mut self, capacity: usize) -> Result<()> {
        debug_assert!(capacity.is_power_of_two());
        debug_assert!(self.count <= self.config.threshold(capacity));
        let fresh = alloc_slots(capacity)?;
        let old = mem::replace(&mut self.slots, fresh);
        let old_capacity = old.len();
        let tombstones = self.used - self.count;
        for slot in old {
            if let Slot::Occupied(e) = slot {
                let idx = first_empty(&self.slots, e.hash);
                self.slots[idx] = Slot::Occupied(e);
            }
        }
        self.used = self.count;
        debug!(
            old_capacity,
            new_capacity = capacity,
            entries = self.count,
            tombstones,
            "rehashed table"
        );
        Ok(())
    }

    fn maybe_shrink(&mut self) {
        if !self.config.should_shrink(self.count, self.capacity()) {
            return;
        }
        let Some(target) = self.config.capacity_for(self.count.saturating_mul(2)) else {
            return;
        };
        if target < self.capacity() {
            // A failed shrink leaves the larger table in place.
            if let Err(err) = self.rehash(target) {
                debug!(%err, "shrink skipped");
            }
        }
    }

    /// Remove `key`, returning its stored key and value without running any
    /// release callback.
    pub fn steal_entry(&mut self, key: &K) -> Option<(K, V)> {
        let idx = self.find_index(key)?;
        let Slot::Occupied(entry) = mem::replace(&mut self.slots[idx], Slot::Tombstone) else {
            return None;
        };
        self.count -= 1;
        self.maybe_shrink();
        Some((entry.key, entry.value))
    }

    /// Remove `key` and hand its value to the caller. No release callback
    /// runs; the stored key is dropped.
    pub fn steal(&mut self, key: &K) -> Option<V> {
        self.steal_entry(key).map(|(_, v)| v)
    }

    /// Remove `key` and release both halves through the callbacks. Returns
    /// whether the key was present.
    pub fn delete(&mut self, key: &K) -> bool {
        match self.steal_entry(key) {
            Some((k, v)) => {
                self.callbacks.release_key(k);
                self.callbacks.release_value(v);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.slots.iter(),
            remaining: self.count,
        }
    }

    /// Call `f` on every entry in storage order. The first error stops the
    /// walk and is returned as is.
    pub fn foreach<E, F>(&self, mut f: F) -> core::result::Result<(), E>
    where
        F: FnMut(&K, &V) -> core::result::Result<(), E>,
    {
        for (k, v) in self.iter() {
            f(k, v)?;
        }
        Ok(())
    }

    /// [`foreach`](Self::foreach) with a status-code callback: zero continues,
    /// anything else stops with [`TableError::CallbackAbort`].
    pub fn foreach_status<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&K, &V) -> i32,
    {
        self.foreach(|k, v| match f(k, v) {
            0 => Ok(()),
            status => Err(TableError::CallbackAbort { status }),
        })
    }

    /// Release every entry and mark all slots empty. Capacity is kept.
    pub fn clear(&mut self) {
        let released = self.count;
        {
            let _s = self.guard.enter();
            for slot in self.slots.iter_mut() {
                if let Slot::Occupied(e) = mem::replace(slot, Slot::Empty) {
                    self.callbacks.release_key(e.key);
                    self.callbacks.release_value(e.value);
                }
            }
        }
        self.count = 0;
        self.used = 0;
        debug!(released, capacity = self.capacity(), "cleared table");
    }

    /// Release every entry through the callbacks and free the slot array.
    pub fn destroy(self) {
        drop(self)
    }
}

impl<K, V> HashTable<K, V>
where
    K: Hash + Eq,
{
    pub fn with_build_hasher<S>(build_hasher: S) -> Result<Self>
    where
        S: BuildHasher + 'static,
    {
        Self::with_config(
            TableConfig::default(),
            Callbacks::from_build_hasher(build_hasher),
        )
    }

    /// Hash with hashbrown's default hasher and compare with `Eq`.
    pub fn with_default_hasher() -> Result<Self> {
        Self::with_build_hasher(hashbrown::hash_map::DefaultHashBuilder::default())
    }
}

impl<K, V> Drop for HashTable<K, V> {
    fn drop(&mut self) {
        if self.callbacks.free_key.is_none() && self.callbacks.free_value.is_none() {
            return;
        }
        let _s = self.guard.enter();
        for slot in self.slots.drain(..) {
            if let Slot::Occupied(e) = slot {
                self.callbacks.release_key(e.key);
                self.callbacks.release_value(e.value);
            }
        }
    }
}

impl<K, V> fmt::Debug for HashTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTable")
            .field("len", &self.count)
            .field("used", &self.used)
            .field("capacity", &self.capacity())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}
