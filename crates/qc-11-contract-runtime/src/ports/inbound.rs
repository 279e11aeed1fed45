//! # Driving Ports (API - Inbound)
//!
//! Interfaces exposed by the Contract Runtime. The scheduler's callers use
//! these to execute batches, and replicas use them to re-execute a single
//! transaction under a failure record received with a verdict.

use crate::domain::entities::BatchOutcome;
use crate::errors::RuntimeError;
use async_trait::async_trait;
use shared_types::{FailureRecord, Transaction, TransactionResult};

/// Synchronous single-transaction execution, used by worker threads.
pub trait TransactionExecutor: Send + Sync {
    /// Execute a transaction from scratch, replaying as needed until its
    /// verdict is reproducible.
    ///
    /// # Errors
    ///
    /// Only worker-fatal conditions; transaction failures are verdicts.
    fn execute(&self, tx: &Transaction) -> Result<TransactionResult, RuntimeError>;

    /// Execute under a failure record produced elsewhere.
    ///
    /// # Errors
    ///
    /// Only worker-fatal conditions.
    fn execute_with_record(
        &self,
        tx: &Transaction,
        record: FailureRecord,
    ) -> Result<TransactionResult, RuntimeError>;
}

/// Primary asynchronous execution API.
///
/// ## Usage
///
/// ```ignore
/// let outcome = api.execute_batch(transactions).await?;
/// for result in &outcome.results {
///     println!("{}: {}", result.tx_id, result.verdict);
/// }
/// ```
#[async_trait]
pub trait ExecutionApi: Send + Sync {
    /// Schedule and execute a batch on the worker pool.
    ///
    /// Returns one result per transaction, in batch order.
    async fn execute_batch(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<BatchOutcome, RuntimeError>;

    /// Execute one transaction outside any batch.
    async fn execute_transaction(
        &self,
        tx: Transaction,
    ) -> Result<TransactionResult, RuntimeError>;

    /// Re-execute one transaction under a received failure record.
    async fn replay_transaction(
        &self,
        tx: Transaction,
        record: FailureRecord,
    ) -> Result<TransactionResult, RuntimeError>;
}
