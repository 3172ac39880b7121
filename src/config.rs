//! Sizing and load-factor knobs for [`HashTable`](crate::HashTable).

use crate::error::{Result, TableError};

/// Default slot count of a freshly created table.
pub const DEFAULT_INITIAL_CAPACITY: usize = 8;
/// Default upper bound on `used / capacity` (live entries plus tombstones).
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 2.0 / 3.0;
/// Default lower bound on `count / capacity` before a shrink is attempted.
pub const DEFAULT_MIN_LOAD_FACTOR: f64 = 0.10;

#[derive(Debug, Clone, PartialEq)]
pub struct TableConfig {
    /// Initial and minimum capacity; rounded up to a power of two.
    pub initial_capacity: usize,
    /// Growth trigger. Must lie in `(0, 1)`.
    pub max_load_factor: f64,
    /// Shrink trigger. Must be below half of `max_load_factor`.
    pub min_load_factor: f64,
    /// Whether `steal`/`delete` may shrink the slot array.
    pub shrink_on_steal: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            min_load_factor: DEFAULT_MIN_LOAD_FACTOR,
            shrink_on_steal: true,
        }
    }
}

impl TableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn max_load_factor(mut self, factor: f64) -> Self {
        self.max_load_factor = factor;
        self
    }

    pub fn min_load_factor(mut self, factor: f64) -> Self {
        self.min_load_factor = factor;
        self
    }

    pub fn shrink_on_steal(mut self, enabled: bool) -> Self {
        self.shrink_on_steal = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.max_load_factor > 0.0 && self.max_load_factor < 1.0) {
            return Err(TableError::InvalidConfig {
                reason: "max_load_factor must be in (0, 1)",
            });
        }
        if !(self.min_load_factor >= 0.0 && self.min_load_factor < self.max_load_factor / 2.0) {
            return Err(TableError::InvalidConfig {
                reason: "min_load_factor must be in [0, max_load_factor / 2)",
            });
        }
        if self.initial_capacity > isize::MAX as usize / 2 {
            return Err(TableError::InvalidConfig {
                reason: "initial_capacity is too large",
            });
        }
        if self.capacity_for(1).is_none() {
            return Err(TableError::InvalidConfig {
                reason: "max_load_factor is too small to hold a single entry",
            });
        }
        Ok(())
    }

    /// Smallest capacity the table will ever use.
    pub(crate) fn min_capacity(&self) -> usize {
        self.initial_capacity.max(1).next_power_of_two()
    }

    /// Largest `used` allowed at `capacity`. Always leaves one empty slot so
    /// probing terminates.
    pub(crate) fn threshold(&self, capacity: usize) -> usize {
        let limit = (capacity as f64 * self.max_load_factor) as usize;
        limit.min(capacity.saturating_sub(1))
    }

    /// Smallest power-of-two capacity, not below the minimum, that can hold
    /// `entries` while staying at or under the threshold.
    pub(crate) fn capacity_for(&self, entries: usize) -> Option<usize> {
        let mut capacity = self.min_capacity();
        while self.threshold(capacity) < entries {
            capacity = capacity.checked_mul(2)?;
        }
        Some(capacity)
    }

    pub(crate) fn should_shrink(&self, count: usize, capacity: usize) -> bool {
        self.shrink_on_steal
            && capacity > self.min_capacity()
            && (count as f64) < capacity as f64 * self.min_load_factor
    }
}
