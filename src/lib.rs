//! probe-table: an embeddable open-addressing hash table over opaque
//! handles, driven entirely by user-supplied callbacks.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a freestanding associative container whose keys and values are
//!   caller-owned handles (typically word-sized: addresses, ids, indices).
//!   The table never inspects them; it only passes them to the callbacks.
//! - Pieces:
//!   - Callbacks<K, V>: `hash`, `equal` and optional `free_key` /
//!     `free_value`, boxed and owned by the table for its whole lifetime.
//!   - TableConfig: initial capacity and the grow/shrink load factors.
//!   - HashTable<K, V>: the slot array, probing, tombstones and rehashing.
//!
//! Storage
//! - A power-of-two `Vec` of `Slot::{Empty, Tombstone, Occupied}`.
//! - Each entry caches the hash computed at insertion. Probing compares the
//!   cached hash before calling `equal`; rehashing reuses it and never calls
//!   `hash` again.
//! - `count` tracks live entries, `used` tracks live entries plus
//!   tombstones. `used` never exceeds `capacity * max_load_factor` and always
//!   leaves an empty slot, so every probe terminates.
//!
//! Probing and resizing
//! - Linear probing from `hash & (capacity - 1)`. Lookups skip tombstones
//!   and stop at the first empty slot. Inserts take the first tombstone on
//!   the path, or the terminating empty slot.
//! - When an insert would consume an empty slot past the threshold, the
//!   table rehashes to the smallest capacity that holds twice the live
//!   entries (never smaller than the current one). Heavy tombstone churn
//!   therefore rebuilds in place instead of growing.
//! - Removals may shrink the array once the live load drops under
//!   `min_load_factor`. A failed shrink allocation is ignored.
//!
//! Ownership
//! - `set` on an existing key replaces the value and returns the old one;
//!   no release callback runs and the incoming key is dropped.
//! - `steal` returns the value and runs no release callback; `steal_entry`
//!   returns key and value untouched; `delete` releases both.
//! - `clear` and drop/`destroy` release every live entry.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync`, no locking.
//! - Callbacks must be pure and must not re-enter the table. In debug builds
//!   re-entry from `hash`/`equal` (or from release callbacks during `clear`
//!   and drop) panics.
//! - Allocation failure surfaces as `TableError::OutOfMemory` and leaves the
//!   table as it was.

pub mod callbacks;
pub mod config;
pub mod error;
pub mod hash_table;
mod hash_table_proptest;
mod reentrancy;

// Public surface
pub use callbacks::{compare_direct, hash_handle, hash_ptr, Callbacks};
pub use config::TableConfig;
pub use error::TableError;
pub use hash_table::{EntryRef, HashTable, Iter};
