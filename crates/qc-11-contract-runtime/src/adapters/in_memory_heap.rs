//! # In-Memory Heap
//!
//! Heap storage backed by a hash map, for tests and single-process use.
//! Optionally restricted to a set of provisioned memory regions; loads
//! outside them report `OutOfRange`.

use crate::errors::StorageError;
use crate::ports::outbound::HeapStorage;
use parking_lot::RwLock;
use shared_types::{ChunkId, MemoryRegion};
use std::collections::{BTreeSet, HashMap};

/// In-memory heap storage.
#[derive(Debug, Default)]
pub struct InMemoryHeap {
    chunks: RwLock<HashMap<ChunkId, Vec<u8>>>,
    /// `None` means every region is provisioned.
    regions: Option<BTreeSet<MemoryRegion>>,
}

impl InMemoryHeap {
    /// Create an empty, unrestricted heap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a heap that only backs the given regions.
    #[must_use]
    pub fn with_regions(regions: impl IntoIterator<Item = MemoryRegion>) -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
            regions: Some(regions.into_iter().collect()),
        }
    }

    /// Seed a chunk directly, bypassing region checks.
    pub fn insert(&self, id: ChunkId, data: Vec<u8>) {
        self.chunks.write().insert(id, data);
    }

    /// Current contents of a chunk.
    #[must_use]
    pub fn get(&self, id: ChunkId) -> Option<Vec<u8>> {
        self.chunks.read().get(&id).cloned()
    }

    /// Number of stored chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    /// Returns true if no chunk is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }

    /// Copy of every chunk, in key order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(ChunkId, Vec<u8>)> {
        let mut chunks: Vec<_> = self
            .chunks
            .read()
            .iter()
            .map(|(id, data)| (*id, data.clone()))
            .collect();
        chunks.sort_by_key(|(id, _)| *id);
        chunks
    }

    fn check_region(&self, id: ChunkId) -> Result<(), StorageError> {
        match &self.regions {
            Some(regions) if !regions.contains(&id.region()) => Err(StorageError::OutOfRange(id)),
            _ => Ok(()),
        }
    }
}

impl HeapStorage for InMemoryHeap {
    fn load(&self, id: ChunkId) -> Result<Option<Vec<u8>>, StorageError> {
        self.check_region(id)?;
        Ok(self.chunks.read().get(&id).cloned())
    }

    fn store(&self, id: ChunkId, data: Vec<u8>) -> Result<(), StorageError> {
        self.check_region(id)?;
        self.chunks.write().insert(id, data);
        Ok(())
    }

    fn remove(&self, id: ChunkId) -> Result<(), StorageError> {
        self.check_region(id)?;
        self.chunks.write().remove(&id);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
