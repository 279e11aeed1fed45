//! # Adapters Layer (Outer Hexagon)
//!
//! Adapters connect the Contract Runtime to external systems.

pub mod in_memory_heap;

pub use in_memory_heap::*;
