//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions for contract execution.
//! These are the interfaces between the runtime and the outside world.
//!
//! - **Driving Ports (Inbound)**: `ExecutionApi`
//! - **Driven Ports (Outbound)**: `HeapStorage`, `Contract`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
