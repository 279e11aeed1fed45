//! # Error Types
//!
//! All error types for contract execution.
//!
//! A [`Fault`] is raised by a host primitive or the resource guard. A
//! [`Trap`] is what a contract's dispatcher returns when it does not complete
//! normally. [`RuntimeError`] is reserved for conditions that stop a worker.

use qc_12_transaction_scheduler::SchedulerError;
use shared_types::{ChunkId, FailureKind, FailureReason};
use thiserror::Error;

// =============================================================================
// FAULTS
// =============================================================================

/// Conditions raised while running contract code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Offset range outside the active chunk.
    #[error("illegal memory access: offset {offset}, size {size}, chunk length {len}")]
    IllegalAccess {
        /// Requested offset.
        offset: usize,
        /// Requested width.
        size: usize,
        /// Current chunk length.
        len: usize,
    },

    /// Offset-based access with no chunk loaded.
    #[error("no active chunk")]
    NoActiveChunk,

    /// Read or write on a chunk that was never created.
    #[error("chunk {0} does not exist")]
    AbsentChunk(ChunkId),

    /// Integer division or remainder by zero.
    #[error("division by zero")]
    DivideByZero,

    /// Integer arithmetic overflowed.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// Float conversion would lose more precision than allowed.
    #[error("precision loss: {0}")]
    PrecisionLoss(String),

    /// Stack budget of the invocation exceeded.
    #[error("stack exhausted: {requested} bytes requested, {available} available")]
    StackExhausted {
        /// Bytes the frame tried to reserve.
        requested: usize,
        /// Bytes left in the budget.
        available: usize,
    },

    /// CPU-time budget of the invocation exceeded.
    #[error("CPU time exceeded")]
    TimeExhausted,

    /// Nesting limit reached.
    #[error("call depth exceeded: {depth} > {max}")]
    CallDepthExceeded {
        /// Depth the call would have had.
        depth: u32,
        /// Configured ceiling.
        max: u32,
    },

    /// Response text larger than the buffer.
    #[error("response overflow: capacity {capacity} bytes")]
    ResponseOverflow {
        /// Buffer capacity.
        capacity: usize,
    },

    /// A fault arrived while a critical area was open.
    #[error("fault inside critical area: {0}")]
    InCriticalArea(Box<Fault>),

    /// Unmatched critical-area enter or exit.
    #[error("session protocol violation: {0}")]
    ProtocolViolation(String),

    /// Storage has no backing state for the chunk.
    #[error("chunk {0} out of range")]
    ChunkOutOfRange(ChunkId),

    /// Storage backend failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Fault {
    /// Failure kind reported for this fault, `None` for worker-fatal faults.
    #[must_use]
    pub fn kind(&self) -> Option<FailureKind> {
        let kind = match self {
            Self::IllegalAccess { .. } | Self::NoActiveChunk | Self::AbsentChunk(_) => {
                FailureKind::IllegalMemoryAccess
            }
            Self::DivideByZero | Self::ArithmeticOverflow | Self::PrecisionLoss(_) => {
                FailureKind::ArithmeticTrap
            }
            Self::StackExhausted { .. } => FailureKind::StackExhausted,
            Self::TimeExhausted => FailureKind::TimeExhausted,
            Self::CallDepthExceeded { .. } => FailureKind::CallDepthExceeded,
            Self::ResponseOverflow { .. } => FailureKind::ResponseOverflow,
            Self::InCriticalArea(_) => FailureKind::FaultInCriticalArea,
            Self::ProtocolViolation(_) => FailureKind::ProtocolViolation,
            Self::ChunkOutOfRange(_) | Self::Storage(_) => return None,
        };
        Some(kind)
    }

    /// Returns true if this fault must not be contained at an invocation
    /// boundary.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InCriticalArea(_) | Self::ProtocolViolation(_)
        ) || self.is_worker_fatal()
    }

    /// Returns true if this fault indicates a scheduling or storage bug and
    /// must stop the worker.
    #[must_use]
    pub fn is_worker_fatal(&self) -> bool {
        matches!(self, Self::ChunkOutOfRange(_) | Self::Storage(_))
    }

    /// Timing-dependent reason to record for replay, if any.
    #[must_use]
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::TimeExhausted => Some(FailureReason::TimeExhausted),
            Self::StackExhausted { .. } => Some(FailureReason::StackExhausted),
            _ => None,
        }
    }
}

// =============================================================================
// TRAPS
// =============================================================================

/// Abnormal return from a contract dispatcher.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Trap {
    /// Business-rule rejection. Effects are discarded and the caller sees
    /// `REVERTED` with the message.
    #[error("revert: {0}")]
    Revert(String),

    /// A nested invocation failed and the contract passes the failure up.
    #[error("nested invocation failed: {0}")]
    Nested(FailureKind),

    /// Fault raised by a host primitive.
    #[error(transparent)]
    Fault(#[from] Fault),
}

impl From<StorageError> for Trap {
    fn from(err: StorageError) -> Self {
        Self::Fault(Fault::Storage(err))
    }
}

// =============================================================================
// STORAGE ERRORS
// =============================================================================

/// Errors from the heap storage port.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No backing state can exist for this chunk.
    #[error("chunk {0} outside provisioned storage")]
    OutOfRange(ChunkId),

    /// Backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

/// Invalid runtime configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Field value rejected by validation.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Environment variable could not be parsed.
    #[error("cannot parse {var}={value}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}

// =============================================================================
// RUNTIME ERRORS
// =============================================================================

/// Conditions that stop a worker or a whole batch.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Scheduler integrity error.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// A transaction hit a worker-fatal fault.
    #[error("transaction {tx_id} stopped the worker: {fault}")]
    WorkerFatal {
        /// Transaction that raised it.
        tx_id: u64,
        /// The fault.
        fault: Fault,
    },

    /// Commit to storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Worker thread could not be started.
    #[error("failed to spawn worker: {0}")]
    WorkerSpawn(String),

    /// Worker thread panicked outside contract code.
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),

    /// Blocking task was cancelled or panicked.
    #[error("execution task failed: {0}")]
    Join(String),
}
