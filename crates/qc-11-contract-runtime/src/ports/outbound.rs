//! # Driven Ports (SPI - Outbound)
//!
//! These are the interfaces the runtime depends on:
//! - Heap storage engine (load/store/remove of chunks)
//! - Contract dispatchers (the code being executed)

use crate::errors::{StorageError, Trap};
use crate::session::{ResponseBuffer, Session};
use shared_types::{ChunkId, StatusCode};

// =============================================================================
// HEAP STORAGE
// =============================================================================

/// Interface to the heap storage engine.
///
/// ## Implementation Notes
///
/// Conflicting chunks are never loaded by two sessions at once; the
/// dependency graph guarantees it. Implementations still need to be
/// `Sync` since unrelated chunks are accessed from many workers.
pub trait HeapStorage: Send + Sync {
    /// Fetch a chunk.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(bytes))` - Chunk exists
    /// * `Ok(None)` - Chunk was never created (or was deleted)
    /// * `Err(StorageError::OutOfRange)` - No backing state can exist for `id`
    fn load(&self, id: ChunkId) -> Result<Option<Vec<u8>>, StorageError>;

    /// Create or replace a chunk.
    fn store(&self, id: ChunkId, data: Vec<u8>) -> Result<(), StorageError>;

    /// Delete a chunk. Deleting an absent chunk is not an error.
    fn remove(&self, id: ChunkId) -> Result<(), StorageError>;
}

// =============================================================================
// CONTRACT DISPATCHER
// =============================================================================

/// Entry point of one application.
///
/// The dispatcher reads a text request, writes its answer into `response`,
/// and returns a status code. Host primitives (heap access, nested and
/// deferred calls, critical areas) are reached through `session`.
///
/// Returning `Err(Trap::Revert(..))` discards the invocation's effects and
/// reports `REVERTED` to the caller. Faults raised by host primitives should
/// be propagated with `?`.
pub trait Contract: Send + Sync {
    /// Handle one request.
    fn dispatch(
        &self,
        session: &mut Session<'_>,
        request: &str,
        response: &mut ResponseBuffer,
    ) -> Result<StatusCode, Trap>;
}

/// Adapter turning a closure into a [`Contract`].
pub struct FnContract<F>(pub F);

impl<F> Contract for FnContract<F>
where
    F: Fn(&mut Session<'_>, &str, &mut ResponseBuffer) -> Result<StatusCode, Trap> + Send + Sync,
{
    fn dispatch(
        &self,
        session: &mut Session<'_>,
        request: &str,
        response: &mut ResponseBuffer,
    ) -> Result<StatusCode, Trap> {
        (self.0)(session, request, response)
    }
}
