//! # Heap Overlay
//!
//! Per-session cache of loaded chunks with an undo journal. Invocations take
//! a journal mark on entry and roll back to it when they fail or revert.
//! Nothing reaches storage until [`HeapOverlay::commit`].

use crate::errors::{Fault, StorageError};
use crate::heap::chunk::{FixedWidth, HeapChunk};
use crate::ports::outbound::HeapStorage;
use shared_types::ChunkId;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug)]
enum Undo {
    Bytes { offset: usize, old: Vec<u8> },
    Resize { old_len: Option<usize>, removed: Vec<u8> },
}

#[derive(Debug)]
struct JournalEntry {
    chunk: ChunkId,
    undo: Undo,
}

/// Buffered view of the heap for one execution attempt.
#[derive(Debug, Default)]
pub struct HeapOverlay {
    chunks: HashMap<ChunkId, HeapChunk>,
    journal: Vec<JournalEntry>,
    dirty: BTreeSet<ChunkId>,
}

impl HeapOverlay {
    /// Create an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached chunk, if loaded.
    #[must_use]
    pub fn get(&self, id: ChunkId) -> Option<&HeapChunk> {
        self.chunks.get(&id)
    }

    /// Ensure `id` is cached, fetching it from storage on first use.
    ///
    /// # Errors
    ///
    /// `ChunkOutOfRange` if storage has no backing state for `id`, `Storage`
    /// on backend failure.
    pub fn load(&mut self, id: ChunkId, storage: &dyn HeapStorage) -> Result<&HeapChunk, Fault> {
        if !self.chunks.contains_key(&id) {
            let data = storage.load(id).map_err(|err| match err {
                StorageError::OutOfRange(id) => Fault::ChunkOutOfRange(id),
                other => Fault::Storage(other),
            })?;
            debug!(chunk = %id, exists = data.is_some(), "Chunk loaded");
            self.chunks.insert(id, HeapChunk::new(id, data));
        }
        self.chunks.get(&id).ok_or(Fault::ChunkOutOfRange(id))
    }

    /// Write a fixed-width value.
    ///
    /// # Errors
    ///
    /// Bounds faults from the chunk; `NoActiveChunk` if `id` was never loaded.
    pub fn store<T: FixedWidth>(&mut self, id: ChunkId, offset: usize, value: T) -> Result<(), Fault> {
        let mut buf = vec![0u8; T::WIDTH];
        value.write_le(&mut buf);
        self.write_bytes(id, offset, &buf)
    }

    /// Overwrite a byte range.
    ///
    /// # Errors
    ///
    /// Bounds faults from the chunk; `NoActiveChunk` if `id` was never loaded.
    pub fn write_bytes(&mut self, id: ChunkId, offset: usize, bytes: &[u8]) -> Result<(), Fault> {
        let chunk = self.chunks.get_mut(&id).ok_or(Fault::NoActiveChunk)?;
        let old = chunk.write_bytes(offset, bytes)?;
        self.journal.push(JournalEntry {
            chunk: id,
            undo: Undo::Bytes { offset, old },
        });
        self.dirty.insert(id);
        Ok(())
    }

    /// Add `amount` to the `i64` at `offset` without exposing the old value.
    ///
    /// # Errors
    ///
    /// `ArithmeticOverflow` on overflow, plus the bounds faults of a load.
    pub fn add_in_place(&mut self, id: ChunkId, offset: usize, amount: i64) -> Result<(), Fault> {
        let current: i64 = self
            .chunks
            .get(&id)
            .ok_or(Fault::NoActiveChunk)?
            .load(offset)?;
        let updated = current
            .checked_add(amount)
            .ok_or(Fault::ArithmeticOverflow)?;
        self.store(id, offset, updated)
    }

    /// Resize a chunk; zero deletes it.
    ///
    /// # Errors
    ///
    /// `IllegalAccess` above the size ceiling; `NoActiveChunk` if never loaded.
    pub fn resize(&mut self, id: ChunkId, new_size: usize) -> Result<(), Fault> {
        let chunk = self.chunks.get_mut(&id).ok_or(Fault::NoActiveChunk)?;
        if !chunk.exists() && new_size == 0 {
            return Ok(());
        }
        let (old_len, removed) = chunk.resize(new_size)?;
        self.journal.push(JournalEntry {
            chunk: id,
            undo: Undo::Resize { old_len, removed },
        });
        self.dirty.insert(id);
        Ok(())
    }

    /// Current journal position.
    #[must_use]
    pub fn mark(&self) -> usize {
        self.journal.len()
    }

    /// Undo every mutation made after `mark`, newest first.
    pub fn rollback_to(&mut self, mark: usize) {
        let undone = self.journal.len().saturating_sub(mark);
        while self.journal.len() > mark {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            let Some(chunk) = self.chunks.get_mut(&entry.chunk) else {
                continue;
            };
            match entry.undo {
                Undo::Bytes { offset, old } => {
                    // Restoring bytes that were just written cannot go out of bounds
                    let _ = chunk.write_bytes(offset, &old);
                }
                Undo::Resize { old_len, removed } => chunk.restore_size(old_len, removed),
            }
        }
        if undone > 0 {
            debug!(mark, undone, "Heap rolled back");
        }
    }

    /// Number of journaled mutations.
    #[must_use]
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Chunks written at least once, in key order.
    pub fn dirty(&self) -> impl Iterator<Item = ChunkId> + '_ {
        self.dirty.iter().copied()
    }

    /// Write every dirty chunk back to storage. Absent chunks are removed.
    ///
    /// # Errors
    ///
    /// Stops at the first storage failure.
    pub fn commit(self, storage: &dyn HeapStorage) -> Result<usize, StorageError> {
        let mut written = 0;
        for id in &self.dirty {
            let Some(chunk) = self.chunks.get(id) else {
                continue;
            };
            match chunk.data() {
                Some(data) => storage.store(*id, data.to_vec())?,
                None => storage.remove(*id)?,
            }
            written += 1;
        }
        Ok(written)
    }
}
