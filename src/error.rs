//! Error type shared by every fallible table operation.

use thiserror::Error;

/// Failures reported by [`HashTable`](crate::HashTable).
///
/// Missing keys are never errors; lookups return `None` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// The slot array could not be reserved. The table is left as it was
    /// before the call.
    #[error("out of memory: could not allocate {slots} slots")]
    OutOfMemory { slots: usize },

    /// A status-style `foreach` callback asked to stop.
    #[error("foreach callback aborted with status {status}")]
    CallbackAbort { status: i32 },

    #[error("invalid table configuration: {reason}")]
    InvalidConfig { reason: &'static str },
}

pub type Result<T, E = TableError> = core::result::Result<T, E>;
