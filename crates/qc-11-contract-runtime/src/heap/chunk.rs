//! # Heap Chunk
//!
//! A resizable byte region keyed by [`ChunkId`]. Three observably different
//! conditions: absent (never created), present but too short for an access,
//! and valid for the access.
//!
//! Fixed-width values are little-endian.

use crate::errors::Fault;
use serde::{Deserialize, Serialize};
use shared_types::ChunkId;
use std::ops::Range;

/// Largest size a chunk may be resized to (16 MB).
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// A value stored at a fixed width inside a chunk.
pub trait FixedWidth: Sized + Copy {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Decode from exactly `WIDTH` bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Encode into exactly `WIDTH` bytes.
    fn write_le(&self, out: &mut [u8]);
}

macro_rules! impl_fixed_width_int {
    ($($ty:ty),*) => {
        $(
            impl FixedWidth for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }

                fn write_le(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_fixed_width_int!(u8, i16, i32, i64, u64);

/// 32-byte public key field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl FixedWidth for PublicKey {
    const WIDTH: usize = 32;

    fn read_le(bytes: &[u8]) -> Self {
        let mut key = [0u8; 32];
        key.copy_from_slice(bytes);
        Self(key)
    }

    fn write_le(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.0);
    }
}

/// One loaded chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapChunk {
    id: ChunkId,
    data: Option<Vec<u8>>,
}

impl HeapChunk {
    /// Wrap what storage returned for `id`. Empty data is treated as absent.
    #[must_use]
    pub fn new(id: ChunkId, data: Option<Vec<u8>>) -> Self {
        Self {
            id,
            data: data.filter(|bytes| !bytes.is_empty()),
        }
    }

    /// Chunk that was never created.
    #[must_use]
    pub fn absent(id: ChunkId) -> Self {
        Self { id, data: None }
    }

    /// Chunk identifier.
    #[must_use]
    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// Returns true if the chunk has been created.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Current length; zero when absent.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    /// Returns true if the chunk is absent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `[offset, offset + size)` lies within the chunk.
    #[must_use]
    pub fn is_valid(&self, offset: usize, size: usize) -> bool {
        self.range(offset, size).is_ok()
    }

    /// Raw bytes, `None` when absent.
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Read a fixed-width value.
    ///
    /// # Errors
    ///
    /// Returns `AbsentChunk` or `IllegalAccess` when the range is invalid.
    pub fn load<T: FixedWidth>(&self, offset: usize) -> Result<T, Fault> {
        Ok(T::read_le(self.read_bytes(offset, T::WIDTH)?))
    }

    /// Read a byte range.
    ///
    /// # Errors
    ///
    /// Returns `AbsentChunk` or `IllegalAccess` when the range is invalid.
    pub fn read_bytes(&self, offset: usize, size: usize) -> Result<&[u8], Fault> {
        let range = self.range(offset, size)?;
        match &self.data {
            Some(data) => Ok(&data[range]),
            None => Err(Fault::AbsentChunk(self.id)),
        }
    }

    /// Overwrite a byte range, returning the previous contents.
    pub(crate) fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<Vec<u8>, Fault> {
        let range = self.range(offset, bytes.len())?;
        let data = self.data.as_mut().ok_or(Fault::AbsentChunk(self.id))?;
        let old = data[range.clone()].to_vec();
        data[range].copy_from_slice(bytes);
        Ok(old)
    }

    /// Grow (zero-filled) or shrink (truncating). Size zero deletes the chunk.
    ///
    /// Returns the previous length (`None` if absent) and the removed bytes.
    pub(crate) fn resize(&mut self, new_size: usize) -> Result<(Option<usize>, Vec<u8>), Fault> {
        if new_size > MAX_CHUNK_SIZE {
            return Err(Fault::IllegalAccess {
                offset: new_size,
                size: 0,
                len: self.len(),
            });
        }
        let old_len = self.data.as_ref().map(Vec::len);
        if new_size == 0 {
            return Ok((old_len, self.data.take().unwrap_or_default()));
        }
        let data = self.data.get_or_insert_with(Vec::new);
        let removed = if new_size < data.len() {
            data.split_off(new_size)
        } else {
            data.resize(new_size, 0);
            Vec::new()
        };
        Ok((old_len, removed))
    }

    /// Undo a [`HeapChunk::resize`].
    pub(crate) fn restore_size(&mut self, old_len: Option<usize>, removed: Vec<u8>) {
        match old_len {
            None => self.data = None,
            Some(len) => {
                let data = self.data.get_or_insert_with(Vec::new);
                data.truncate(len);
                data.extend_from_slice(&removed);
                debug_assert_eq!(data.len(), len);
            }
        }
    }

    fn range(&self, offset: usize, size: usize) -> Result<Range<usize>, Fault> {
        let Some(data) = &self.data else {
            return Err(Fault::AbsentChunk(self.id));
        };
        match offset.checked_add(size) {
            Some(end) if end <= data.len() => Ok(offset..end),
            _ => Err(Fault::IllegalAccess {
                offset,
                size,
                len: data.len(),
            }),
        }
    }
}
