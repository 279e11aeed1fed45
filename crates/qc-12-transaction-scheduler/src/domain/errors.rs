//! Error types for Transaction Scheduling
//!
//! Every variant is a programming or configuration error: a bad graph, a
//! result for an unknown transaction, a double submission. None of them is a
//! transaction failure, and none is retried.

use shared_types::TxId;
use thiserror::Error;

/// All errors that can occur in transaction scheduling
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Cycle detected in dependency graph
    #[error("Cycle detected in dependency graph")]
    CycleDetected,

    /// Batch size exceeded limits
    #[error("Batch size exceeded: {size} > {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// Edge count exceeded limits
    #[error("Edge count exceeded: {count} > {max}")]
    TooManyEdges { count: usize, max: usize },

    /// Transaction id not present in the index
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(TxId),

    /// Same id added twice to one batch
    #[error("Duplicate transaction id: {0}")]
    DuplicateTransaction(TxId),

    /// Edge from a transaction to itself
    #[error("Transaction {0} depends on itself")]
    SelfDependency(TxId),

    /// Result submitted for a transaction that is not running
    #[error("Result for transaction {tx_id} submitted in state {state}")]
    NotRunning { tx_id: TxId, state: &'static str },

    /// In-degree decremented below zero (graph corruption)
    #[error("In-degree underflow on transaction {0}")]
    InDegreeUnderflow(TxId),

    /// Ready queue yielded a transaction that was not ready
    #[error("Dequeued transaction {tx_id} in state {state}")]
    NotReady { tx_id: TxId, state: &'static str },

    /// Workers stopped with transactions still lacking a result
    #[error("Batch stopped with {remaining} transactions unfinished")]
    Incomplete { remaining: usize },
}
