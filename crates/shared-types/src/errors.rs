//! # Error Types
//!
//! Errors raised while handling shared identifiers.

use thiserror::Error;

/// Errors produced when decoding identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdError {
    /// Text is not in `app:account:slot` form.
    #[error("Malformed chunk id: {0:?}")]
    Malformed(String),

    /// Packed key uses bits above the 112-bit layout.
    #[error("Chunk key out of range: {0:#x}")]
    KeyOutOfRange(u128),
}
