//! Inbound Ports (Driving Ports / API)
//!
//! Worker threads drive a batch through this trait. Calls block on the
//! ready queue, so the trait is synchronous and meant for dedicated threads.

use crate::domain::errors::SchedulerError;
use shared_types::{Transaction, TransactionResult};
use std::sync::Arc;

/// Primary scheduling API
pub trait TransactionScheduler: Send + Sync {
    /// Block until a transaction whose predecessors have all completed is
    /// available.
    ///
    /// Returns `None` once the batch is finished or aborted; the worker
    /// should exit its loop.
    fn next_transaction(&self) -> Option<Arc<Transaction>>;

    /// Report the outcome of a transaction obtained from
    /// [`TransactionScheduler::next_transaction`].
    ///
    /// Releases dependents whose last predecessor this was. Submitting for a
    /// transaction that is not running is an error.
    fn submit_result(&self, result: TransactionResult) -> Result<(), SchedulerError>;

    /// Stop handing out work and wake every blocked worker.
    fn abort(&self);
}
