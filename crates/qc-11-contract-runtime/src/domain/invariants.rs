//! # Domain Invariants
//!
//! Properties every execution outcome must satisfy. Checked by tests and by
//! the service after each batch in debug builds.

use crate::config::RuntimeConfig;
use crate::domain::entities::BatchOutcome;
use shared_types::{FailureKind, Transaction, TransactionResult, Verdict};

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// A timing-dependent failure verdict must be backed by the failure record
/// that reproduces it.
#[must_use]
pub fn check_record_backs_verdict(result: &TransactionResult) -> bool {
    match result.verdict {
        Verdict::Failed(FailureKind::TimeExhausted | FailureKind::StackExhausted) => {
            !result.failure_record.is_empty()
        }
        _ => true,
    }
}

/// The number of attempts stays within the replay bound.
#[must_use]
pub fn check_attempts_bound(result: &TransactionResult, config: &RuntimeConfig) -> bool {
    result.attempts >= 1 && result.attempts <= config.max_replay_attempts + 1
}

/// One result per transaction, in batch order.
#[must_use]
pub fn check_results_complete(transactions: &[Transaction], outcome: &BatchOutcome) -> bool {
    transactions.len() == outcome.results.len()
        && transactions
            .iter()
            .zip(&outcome.results)
            .all(|(tx, result)| tx.id == result.tx_id)
}

/// Two executions of the same transaction agree on verdict and response.
#[must_use]
pub fn check_determinism(first: &TransactionResult, second: &TransactionResult) -> bool {
    first.tx_id == second.tx_id
        && first.verdict == second.verdict
        && first.response == second.response
}

/// Check every per-batch invariant at once.
#[must_use]
pub fn check_all_invariants(
    transactions: &[Transaction],
    outcome: &BatchOutcome,
    config: &RuntimeConfig,
) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_results_complete(transactions, outcome) {
        violations.push(InvariantViolation::ResultsIncomplete {
            expected: transactions.len(),
            actual: outcome.results.len(),
        });
    }

    for result in &outcome.results {
        if !check_record_backs_verdict(result) {
            violations.push(InvariantViolation::UnbackedVerdict {
                tx_id: result.tx_id,
            });
        }
        if !check_attempts_bound(result, config) {
            violations.push(InvariantViolation::TooManyAttempts {
                tx_id: result.tx_id,
                attempts: result.attempts,
            });
        }
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Missing or reordered results.
    ResultsIncomplete {
        /// Transactions in the batch.
        expected: usize,
        /// Results returned.
        actual: usize,
    },
    /// Timing failure with an empty failure record.
    UnbackedVerdict {
        /// Offending transaction.
        tx_id: u64,
    },
    /// More attempts than the replay bound allows.
    TooManyAttempts {
        /// Offending transaction.
        tx_id: u64,
        /// Attempts made.
        attempts: u32,
    },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResultsIncomplete { expected, actual } => {
                write!(f, "expected {expected} results in batch order, got {actual}")
            }
            Self::UnbackedVerdict { tx_id } => {
                write!(f, "transaction {tx_id} failed on timing without a failure record")
            }
            Self::TooManyAttempts { tx_id, attempts } => {
                write!(f, "transaction {tx_id} took {attempts} attempts")
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
