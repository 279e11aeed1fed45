//! # Shared Types Crate
//!
//! Types that cross the boundary between the transaction scheduler (12) and
//! the contract runtime (11).
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: identifiers, transactions and verdicts are
//!   defined once, here.
//! - **Opaque Identifiers**: applications, accounts and chunks are fixed-width
//!   integers with no numbering scheme attached.
//! - **Portable Verdicts**: a `TransactionResult` carries its `FailureRecord`
//!   so any replica can replay the transaction to the same verdict.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
