//! Debug-only detection of callbacks re-entering the table.
//!
//! Hash and equality callbacks run while a probe is in flight, and release
//! callbacks run while `clear`/drop sweep the slot array. Calling back into
//! the same table from there would observe a half-updated table. Debug
//! builds panic on the nested entry; release builds compile the check away.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

/// Per-table flag, set while user callbacks may be running.
#[derive(Debug, Default)]
pub(crate) struct CallbackGuard {
    #[cfg(debug_assertions)]
    in_callback: Cell<bool>,
}

/// Scope returned by [`CallbackGuard::enter`]; clears the flag on drop.
pub(crate) struct Section<'a> {
    #[cfg(debug_assertions)]
    flag: &'a Cell<bool>,
    _guard: PhantomData<&'a CallbackGuard>,
}

impl CallbackGuard {
    #[inline]
    pub(crate) fn enter(&self) -> Section<'_> {
        #[cfg(debug_assertions)]
        assert!(
            !self.in_callback.replace(true),
            "hash table re-entered from one of its callbacks"
        );
        Section {
            #[cfg(debug_assertions)]
            flag: &self.in_callback,
            _guard: PhantomData,
        }
    }
}

impl Drop for Section<'_> {
    #[inline]
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.flag.set(false);
    }
}
