//! # Heap Chunk Access Layer
//!
//! Bounds-checked, offset-addressed views over ledger state chunks, and the
//! per-session overlay that buffers writes until the transaction commits.

pub mod chunk;
pub mod overlay;

pub use chunk::{FixedWidth, HeapChunk, PublicKey, MAX_CHUNK_SIZE};
pub use overlay::HeapOverlay;
