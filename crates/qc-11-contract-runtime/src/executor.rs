//! # Transaction Executor
//!
//! Runs one transaction to a reproducible verdict.
//!
//! ## Replay Loop
//!
//! 1. Run an attempt under the current failure record (empty at first).
//! 2. If the attempt observed a new timing fault, add it to the record and
//!    run again, up to `max_replay_attempts` times.
//! 3. Take the verdict of the last attempt. Commit its heap effects only if
//!    the root invocation completed.
//!
//! The returned record lets another replica reproduce the verdict with
//! [`TransactionExecutor::execute_with_record`].

use crate::config::RuntimeConfig;
use crate::domain::entities::CallResult;
use crate::errors::{Fault, RuntimeError};
use crate::heap::HeapOverlay;
use crate::ports::inbound::TransactionExecutor;
use crate::ports::outbound::HeapStorage;
use crate::registry::ContractRegistry;
use crate::session::Session;
use qc_telemetry::metrics::{record_transaction, REPLAYS};
use shared_types::{FailureKind, FailureRecord, Transaction, TransactionResult, Verdict};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How one attempt ended.
enum AttemptOutcome {
    Call(CallResult),
    Fatal(Fault),
    Panicked,
}

/// One attempt and the record the next attempt would run under.
struct Attempt {
    outcome: AttemptOutcome,
    record: FailureRecord,
    observed_new_fault: bool,
    heap: Option<HeapOverlay>,
}

/// Executes transactions against a registry and a heap store.
pub struct Executor<S: HeapStorage> {
    registry: Arc<ContractRegistry>,
    storage: Arc<S>,
    config: RuntimeConfig,
}

impl<S: HeapStorage> Executor<S> {
    /// Create an executor.
    pub fn new(registry: Arc<ContractRegistry>, storage: Arc<S>, config: RuntimeConfig) -> Self {
        Self {
            registry,
            storage,
            config,
        }
    }

    /// Runtime limits in use.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Heap store effects are committed to.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Registered applications.
    pub fn registry(&self) -> &Arc<ContractRegistry> {
        &self.registry
    }

    fn run_attempt(&self, tx: &Transaction, record: FailureRecord) -> Attempt {
        let fallback = record.clone();
        let storage: &dyn HeapStorage = &*self.storage;
        let run = catch_unwind(AssertUnwindSafe(|| {
            let mut session = Session::new(tx, &self.registry, storage, &self.config, record);
            let result = session.run();
            let (failures, heap) = session.into_parts();
            (result, failures, heap)
        }));

        match run {
            Ok((result, failures, heap)) => Attempt {
                outcome: match result {
                    Ok(call) => AttemptOutcome::Call(call),
                    Err(fault) => AttemptOutcome::Fatal(fault),
                },
                observed_new_fault: failures.observed().is_some(),
                record: failures.into_record(),
                heap: Some(heap),
            },
            Err(_) => {
                warn!(tx_id = tx.id, "Contract panicked, attempt discarded");
                Attempt {
                    outcome: AttemptOutcome::Panicked,
                    record: fallback,
                    observed_new_fault: false,
                    heap: None,
                }
            }
        }
    }

    fn run_to_verdict(
        &self,
        tx: &Transaction,
        record: FailureRecord,
    ) -> Result<TransactionResult, RuntimeError> {
        let started = Instant::now();
        let mut record = record;
        let mut attempts: u32 = 0;

        let attempt = loop {
            attempts += 1;
            let attempt = self.run_attempt(tx, record);
            if attempt.observed_new_fault && attempts <= self.config.max_replay_attempts {
                REPLAYS.inc();
                info!(
                    tx_id = tx.id,
                    attempt = attempts,
                    flagged = attempt.record.len(),
                    "Replaying transaction with updated failure record"
                );
                record = attempt.record;
                continue;
            }
            break attempt;
        };

        let (verdict, response) = match attempt.outcome {
            AttemptOutcome::Call(call) => call.into_verdict(),
            AttemptOutcome::Fatal(fault) => match fault.kind() {
                Some(kind) => (Verdict::Failed(kind), kind.to_string()),
                None => {
                    warn!(tx_id = tx.id, error = %fault, "Worker-fatal fault");
                    return Err(RuntimeError::WorkerFatal { tx_id: tx.id, fault });
                }
            },
            AttemptOutcome::Panicked => (
                Verdict::Failed(FailureKind::ContractPanic),
                FailureKind::ContractPanic.to_string(),
            ),
        };

        if let (Verdict::Completed(_), Some(heap)) = (&verdict, attempt.heap) {
            let written = heap.commit(&*self.storage)?;
            debug!(tx_id = tx.id, chunks = written, "Heap effects committed");
        }

        let label = match verdict {
            Verdict::Completed(status) if status.is_ok() => "ok",
            Verdict::Completed(_) => "client_error",
            Verdict::Failed(_) => "failed",
        };
        record_transaction(label, started.elapsed().as_secs_f64());
        debug!(tx_id = tx.id, %verdict, attempts, "Transaction executed");

        Ok(TransactionResult {
            tx_id: tx.id,
            verdict,
            response,
            attempts,
            failure_record: attempt.record,
        })
    }
}

impl<S: HeapStorage> TransactionExecutor for Executor<S> {
    fn execute(&self, tx: &Transaction) -> Result<TransactionResult, RuntimeError> {
        self.run_to_verdict(tx, FailureRecord::new())
    }

    fn execute_with_record(
        &self,
        tx: &Transaction,
        record: FailureRecord,
    ) -> Result<TransactionResult, RuntimeError> {
        self.run_to_verdict(tx, record)
    }
}
