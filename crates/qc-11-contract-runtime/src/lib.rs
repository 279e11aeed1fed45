//! # QC-11 Contract Runtime - Execution Containment Subsystem
//!
//! **Subsystem ID:** 11  
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Executes the transactions handed out by the scheduler (Subsystem 12).
//! Each transaction runs in a session that contains faults at invocation
//! boundaries, rolls back the heap effects of failed calls, and turns
//! timing-dependent failures into verdicts every replica can reproduce.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Timing failures are backed by a failure record | `domain/invariants.rs` - `check_record_backs_verdict()` |
//! | Attempts never exceed `max_replay_attempts + 1` | `executor.rs` - replay loop |
//! | One result per transaction, in batch order | `service.rs` - `run_batch()` |
//! | Failed or reverted calls leave no heap effects | `session/mod.rs` - `unwind()` |
//! | Faults inside critical areas are fatal | `session/mod.rs` - `raise()` |
//!
//! ## Execution Limits
//!
//! | Limit | Default | Purpose |
//! |-------|---------|---------|
//! | `default_time_coefficient_ns` | 300 µs / gas | CPU budget of an invocation |
//! | `flagged_time_coefficient_ns` | 1.5 µs / gas | Budget of an invocation replayed to time out |
//! | `default_stack_size` | 1 MiB | Stack budget of an invocation |
//! | `flagged_stack_size` | 16 KiB | Budget of an invocation replayed to exhaust its stack |
//! | `max_call_depth` | 64 | Nesting ceiling |
//! | `response_capacity` | 64 KiB | Response buffer size |
//!
//! ## Outbound Dependencies
//!
//! | Dependency | Trait | Purpose |
//! |------------|-------|---------|
//! | Heap storage | `HeapStorage` | Load and commit chunks |
//! | Applications | `Contract` | Dispatchers being executed |
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Session | `session/` | Frames, fault delivery, host primitives |
//! | Heap overlay | `heap/` | Buffered chunks with an undo journal |
//! | Failure manager | `failure.rs` | Invocation ids and replay budgets |
//! | Executor | `executor.rs` | Replay loop and commit |
//! | Service | `service.rs` | Worker pool over the scheduler |
//!
//! ## Usage Example
//!
//! ```ignore
//! use qc_11_contract_runtime::prelude::*;
//!
//! let mut registry = ContractRegistry::new();
//! registry.register_fn(AppId(1), |session, request, response| {
//!     session.load_chunk(ChunkId::new(AppId(1), AccountId(1), 0))?;
//!     response.write(&session.load_int64(0)?.to_string())?;
//!     Ok(StatusCode::OK)
//! });
//!
//! let service = create_test_service(registry)?;
//! let outcome = service.execute_batch(transactions).await?;
//! for result in &outcome.results {
//!     println!("{}: {}", result.tx_id, result.verdict);
//! }
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod executor;
pub mod failure;
pub mod heap;
pub mod numeric;
pub mod ports;
pub mod registry;
pub mod service;
pub mod session;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{BatchOutcome, CallOutcome, CallResult, SessionState};

    // Invariants
    pub use crate::domain::invariants::{
        check_all_invariants, check_determinism, InvariantCheckResult, InvariantViolation,
    };

    // Configuration
    pub use crate::config::RuntimeConfig;

    // Errors
    pub use crate::errors::{ConfigError, Fault, RuntimeError, StorageError, Trap};

    // Heap
    pub use crate::heap::{FixedWidth, HeapChunk, HeapOverlay, PublicKey};

    // Ports
    pub use crate::ports::inbound::{ExecutionApi, TransactionExecutor};
    pub use crate::ports::outbound::{Contract, FnContract, HeapStorage};

    // Session
    pub use crate::session::{DeferredCall, ResponseBuffer, Session};

    // Runtime
    pub use crate::adapters::InMemoryHeap;
    pub use crate::executor::Executor;
    pub use crate::registry::ContractRegistry;
    pub use crate::service::{create_test_service, ExecutionService, ServiceConfig, ServiceStats};

    // Shared types
    pub use shared_types::{
        AccessKey, AccountId, AppId, ChunkId, FailureKind, FailureReason, FailureRecord,
        MemoryRegion, StatusCode, Transaction, TransactionResult, Verdict,
    };
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem ID.
pub const SUBSYSTEM_ID: u8 = 11;

/// Subsystem name.
pub const SUBSYSTEM_NAME: &str = "Contract Runtime";

// =============================================================================
// TESTS
// =============================================================================
