//! # Domain Entities
//!
//! Outcomes of invocations, sessions and batches.

use crate::errors::Trap;
use qc_12_transaction_scheduler::NodeTimeline;
use serde::{Deserialize, Serialize};
use shared_types::{FailureKind, InvocationId, StatusCode, TransactionResult, Verdict};

// =============================================================================
// SESSION STATE
// =============================================================================

/// Lifecycle of an execution session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, root not yet invoked.
    #[default]
    Idle,
    /// Executing at the given call depth (root = 1).
    Running {
        /// Current depth.
        depth: u32,
    },
    /// A fatal fault ended the session.
    Faulted,
    /// Root invocation returned.
    Completed,
}

// =============================================================================
// CALL RESULT
// =============================================================================

/// What an invocation produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    /// The dispatcher returned a status code (including `REVERTED`).
    Completed {
        /// Status code.
        status: StatusCode,
        /// Response text, or the revert message.
        response: String,
    },
    /// The invocation faulted and its effects were discarded.
    Failed(FailureKind),
}

/// Result of one nested or root invocation, as seen by its caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResult {
    /// Sequence number, `None` if the call was rejected before starting.
    pub invocation: Option<InvocationId>,
    /// Outcome.
    pub outcome: CallOutcome,
}

impl CallResult {
    /// Completed invocation.
    #[must_use]
    pub fn completed(
        invocation: Option<InvocationId>,
        status: StatusCode,
        response: impl Into<String>,
    ) -> Self {
        Self {
            invocation,
            outcome: CallOutcome::Completed {
                status,
                response: response.into(),
            },
        }
    }

    /// Failed invocation.
    #[must_use]
    pub fn failed(invocation: Option<InvocationId>, kind: FailureKind) -> Self {
        Self {
            invocation,
            outcome: CallOutcome::Failed(kind),
        }
    }

    /// Returns true if the call completed with an OK status.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(&self.outcome, CallOutcome::Completed { status, .. } if status.is_ok())
    }

    /// Status code, if the call completed.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match &self.outcome {
            CallOutcome::Completed { status, .. } => Some(*status),
            CallOutcome::Failed(_) => None,
        }
    }

    /// Response text, empty for failed calls.
    #[must_use]
    pub fn response(&self) -> &str {
        match &self.outcome {
            CallOutcome::Completed { response, .. } => response,
            CallOutcome::Failed(_) => "",
        }
    }

    /// Failure kind, if the call failed.
    #[must_use]
    pub fn failure(&self) -> Option<FailureKind> {
        match &self.outcome {
            CallOutcome::Failed(kind) => Some(*kind),
            CallOutcome::Completed { .. } => None,
        }
    }

    /// Status and response, or a trap passing the failure to the caller's
    /// caller.
    ///
    /// # Errors
    ///
    /// `Trap::Nested` with the failure kind if the call failed.
    pub fn into_response(self) -> Result<(StatusCode, String), Trap> {
        match self.outcome {
            CallOutcome::Completed { status, response } => Ok((status, response)),
            CallOutcome::Failed(kind) => Err(Trap::Nested(kind)),
        }
    }

    /// Transaction verdict and response text for a root result.
    #[must_use]
    pub fn into_verdict(self) -> (Verdict, String) {
        match self.outcome {
            CallOutcome::Completed { status, response } => (Verdict::Completed(status), response),
            CallOutcome::Failed(kind) => (Verdict::Failed(kind), kind.to_string()),
        }
    }
}

// =============================================================================
// BATCH OUTCOME
// =============================================================================

/// Results of one scheduled batch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// One result per transaction, in batch order.
    pub results: Vec<TransactionResult>,
    /// Dispatch and completion stamps, in batch order.
    pub timeline: Vec<NodeTimeline>,
    /// Widest level of the dependency graph.
    pub max_parallelism: usize,
}

impl BatchOutcome {
    /// Result for one transaction.
    #[must_use]
    pub fn result(&self, tx_id: u64) -> Option<&TransactionResult> {
        self.results.iter().find(|r| r.tx_id == tx_id)
    }

    /// Number of transactions whose verdict is an OK completion.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.verdict.is_success()).count()
    }
}
