//! # Quantum-Chain Test Suite
//!
//! Unified test crate for the scheduler and the contract runtime.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── contracts.rs      # Fixture applications (token, ledger, vault, fib, ...)
//! │
//! ├── benchmarks/       # Criterion benchmarks per subsystem
//! │   ├── qc_11_runtime.rs
//! │   └── qc_12_scheduler.rs
//! │
//! └── integration/      # Scheduler + runtime end to end
//!     ├── batch_execution.rs
//!     ├── critical_areas.rs
//!     ├── deferred_calls.rs
//!     └── deterministic_replay.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qc-tests
//!
//! # By scenario
//! cargo test -p qc-tests integration::deterministic_replay::
//!
//! # Benchmarks
//! cargo bench -p qc-tests
//! ```

#![allow(dead_code)]

pub mod benchmarks;
pub mod contracts;
pub mod integration;
