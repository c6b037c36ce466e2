//! World error types.

use thiserror::Error;

/// Failures a world propagates to its caller.
///
/// Only resource exhaustion is representable here; contract violations
/// (invalid entity, missing component, duplicate requested type) indicate a
/// bug at the call site and panic instead of producing an error value.
/// A returned error guarantees the world was not modified by the failed
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorldError {
    /// Every 32-bit entity index is in use; no new slot can be appended.
    #[error("entity index space exhausted: {slots} slots allocated")]
    IndexSpaceExhausted {
        /// Number of directory slots currently allocated.
        slots: usize,
    },

    /// A slot's version counter reached its maximum and the entity can no
    /// longer be destroyed without breaking stale-id detection.
    #[error("entity version exhausted for slot {index}")]
    VersionExhausted {
        /// Directory index of the exhausted slot.
        index: u32,
    },
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
