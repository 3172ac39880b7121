//! User callbacks owned by a table, plus ready-made ones for word-sized
//! handles.

use core::fmt;
use core::hash::{BuildHasher, Hash};

pub type HashFn<K> = Box<dyn Fn(&K) -> u64>;
pub type EqualFn<K> = Box<dyn Fn(&K, &K) -> bool>;
pub type FreeFn<T> = Box<dyn FnMut(T)>;

/// The callback set of a table. Fixed for the table's lifetime.
pub struct Callbacks<K, V> {
    pub(crate) hash: HashFn<K>,
    pub(crate) equal: EqualFn<K>,
    pub(crate) free_key: Option<FreeFn<K>>,
    pub(crate) free_value: Option<FreeFn<V>>,
}

impl<K, V> Callbacks<K, V> {
    pub fn new<H, E>(hash: H, equal: E) -> Self
    where
        H: Fn(&K) -> u64 + 'static,
        E: Fn(&K, &K) -> bool + 'static,
    {
        Self {
            hash: Box::new(hash),
            equal: Box::new(equal),
            free_key: None,
            free_value: None,
        }
    }

    /// Release hook for keys leaving the table through `delete`, `clear` or
    /// destruction. `steal` and `steal_entry` never call it.
    pub fn free_key<F>(mut self, f: F) -> Self
    where
        F: FnMut(K) + 'static,
    {
        self.free_key = Some(Box::new(f));
        self
    }

    /// Release hook for values leaving the table through `delete`, `clear`
    /// or destruction. `steal` and `steal_entry` never call it.
    pub fn free_value<F>(mut self, f: F) -> Self
    where
        F: FnMut(V) + 'static,
    {
        self.free_value = Some(Box::new(f));
        self
    }

    pub(crate) fn release_key(&mut self, key: K) {
        if let Some(f) = self.free_key.as_mut() {
            f(key);
        }
    }

    pub(crate) fn release_value(&mut self, value: V) {
        if let Some(f) = self.free_value.as_mut() {
            f(value);
        }
    }
}

impl<K, V> Callbacks<K, V>
where
    K: Hash + Eq,
{
    /// Hash through `build_hasher`, compare with `Eq`.
    pub fn from_build_hasher<S>(build_hasher: S) -> Self
    where
        S: BuildHasher + 'static,
    {
        Self::new(move |k: &K| build_hasher.hash_one(k), |a: &K, b: &K| a == b)
    }
}

impl<K, V> fmt::Debug for Callbacks<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("free_key", &self.free_key.is_some())
            .field("free_value", &self.free_value.is_some())
            .finish_non_exhaustive()
    }
}

/// Hash of a handle's bit pattern.
///
/// Addresses of heap objects share their low alignment bits, so the value is
/// rotated right by 4 bits to spread them across slots.
#[inline]
pub fn hash_handle(handle: usize) -> u64 {
    handle.rotate_right(4) as u64
}

/// [`hash_handle`] over a pointer's address. The pointee is never read.
#[inline]
pub fn hash_ptr<T: ?Sized>(ptr: *const T) -> u64 {
    hash_handle(ptr as *const () as usize)
}

/// Identity comparison for handles.
#[inline]
pub fn compare_direct<K: PartialEq>(a: &K, b: &K) -> bool {
    a == b
}
