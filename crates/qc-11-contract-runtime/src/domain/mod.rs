//! # Domain Layer (Inner Hexagon)
//!
//! Outcome types and invariants of contract execution.
//! NO I/O, NO async.

pub mod entities;
pub mod invariants;

pub use entities::*;
pub use invariants::*;
