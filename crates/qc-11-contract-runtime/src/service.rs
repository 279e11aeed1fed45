//! # Execution Service
//!
//! Runs scheduled batches on a pool of worker threads.
//!
//! ## Worker Loop
//!
//! Each worker repeatedly takes a ready transaction from the scheduler,
//! executes it to a verdict, and submits the result. Conflicting
//! transactions are never ready at the same time, so workers share the heap
//! store without further coordination.
//!
//! A worker-fatal error aborts the scheduler, which wakes every blocked
//! worker; the batch then fails as a whole.
//!
//! ## Async Surface
//!
//! [`ExecutionApi`] wraps the blocking calls in `spawn_blocking` so a tokio
//! runtime is never stalled by contract code.

use crate::adapters::InMemoryHeap;
use crate::config::{env_or, RuntimeConfig};
use crate::domain::entities::BatchOutcome;
use crate::errors::{ConfigError, RuntimeError};
use crate::executor::Executor;
use crate::ports::inbound::{ExecutionApi, TransactionExecutor};
use crate::ports::outbound::HeapStorage;
use crate::registry::ContractRegistry;

use async_trait::async_trait;
use parking_lot::RwLock;
use qc_12_transaction_scheduler::{Scheduler, SchedulerConfig};
use qc_telemetry::metrics::{BATCHES_ABORTED, READY_QUEUE_DEPTH};
use serde::{Deserialize, Serialize};
use shared_types::{FailureRecord, Transaction, TransactionResult};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Default worker stack size (8 MiB).
pub const DEFAULT_WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Smallest worker stack accepted by validation (256 KiB).
pub const MIN_WORKER_STACK_SIZE: usize = 256 * 1024;

/// Execution service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Runtime limits.
    pub runtime: RuntimeConfig,
    /// Scheduler limits.
    pub scheduler: SchedulerConfig,
    /// Worker threads per batch.
    pub worker_threads: usize,
    /// Stack size of each worker thread (bytes).
    pub worker_stack_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            scheduler: SchedulerConfig::default(),
            worker_threads: thread::available_parallelism().map_or(4, |n| n.get()),
            worker_stack_size: DEFAULT_WORKER_STACK_SIZE,
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden from the environment.
    ///
    /// Reads the `QC_RUNTIME_*` variables of [`RuntimeConfig::from_env`] plus
    /// `QC_RUNTIME_WORKERS`, `QC_RUNTIME_WORKER_STACK_SIZE` and
    /// `QC_SCHEDULER_MAX_BATCH_SIZE`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on unparsable or inconsistent values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            runtime: RuntimeConfig::from_env()?,
            scheduler: SchedulerConfig {
                max_batch_size: env_or(
                    "QC_SCHEDULER_MAX_BATCH_SIZE",
                    defaults.scheduler.max_batch_size,
                )?,
                ..defaults.scheduler
            },
            worker_threads: env_or("QC_RUNTIME_WORKERS", defaults.worker_threads)?,
            worker_stack_size: env_or("QC_RUNTIME_WORKER_STACK_SIZE", defaults.worker_stack_size)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.runtime.validate()?;
        if self.worker_threads == 0 {
            return Err(ConfigError::Invalid {
                field: "worker_threads",
                reason: "must be positive".to_string(),
            });
        }
        if self.worker_stack_size < MIN_WORKER_STACK_SIZE {
            return Err(ConfigError::Invalid {
                field: "worker_stack_size",
                reason: format!("must be at least {MIN_WORKER_STACK_SIZE} bytes"),
            });
        }
        Ok(())
    }
}

/// Statistics for the execution service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Batches executed to completion.
    pub batches_executed: u64,
    /// Batches stopped by a worker-fatal error.
    pub batches_aborted: u64,
    /// Transactions executed to a verdict.
    pub transactions_executed: u64,
    /// Verdicts that completed with an OK status.
    pub successful_executions: u64,
    /// Verdicts with a failure kind.
    pub failed_executions: u64,
    /// Transactions that needed more than one attempt.
    pub replayed_transactions: u64,
    /// Average batch wall time in microseconds.
    pub avg_batch_time_us: u64,
}

impl ServiceStats {
    fn record(&mut self, result: &TransactionResult) {
        self.transactions_executed += 1;
        if result.verdict.is_success() {
            self.successful_executions += 1;
        }
        if matches!(result.verdict, shared_types::Verdict::Failed(_)) {
            self.failed_executions += 1;
        }
        if result.attempts > 1 {
            self.replayed_transactions += 1;
        }
    }
}

/// Aborts the scheduler if a worker unwinds, so its peers stop waiting.
struct AbortOnPanic<'a>(&'a Scheduler);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

/// The contract execution service.
pub struct ExecutionService<S: HeapStorage> {
    executor: Arc<Executor<S>>,
    config: Arc<ServiceConfig>,
    stats: Arc<RwLock<ServiceStats>>,
}

impl<S: HeapStorage> Clone for ExecutionService<S> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            config: Arc::clone(&self.config),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<S: HeapStorage> ExecutionService<S> {
    /// Create a service over `storage` with the applications in `registry`.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Config` if `config` fails validation.
    pub fn new(
        registry: ContractRegistry,
        storage: Arc<S>,
        config: ServiceConfig,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        info!(
            apps = registry.len(),
            workers = config.worker_threads,
            max_call_depth = config.runtime.max_call_depth,
            "Execution service created"
        );
        let executor = Executor::new(Arc::new(registry), storage, config.runtime.clone());
        Ok(Self {
            executor: Arc::new(executor),
            config: Arc::new(config),
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        })
    }

    /// Service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Heap store effects are committed to.
    pub fn storage(&self) -> &Arc<S> {
        self.executor.storage()
    }

    /// Snapshot of the service statistics.
    pub fn stats(&self) -> ServiceStats {
        self.stats.read().clone()
    }

    /// Schedule and execute a batch, blocking until every transaction has a
    /// verdict.
    ///
    /// # Errors
    ///
    /// Scheduler rejections (oversized batch, duplicate ids), a scheduler
    /// integrity error, or the first worker-fatal error; a failed batch has
    /// no partial results.
    #[instrument(skip(self, transactions), fields(tx_count = transactions.len()))]
    pub fn run_batch(&self, transactions: Vec<Transaction>) -> Result<BatchOutcome, RuntimeError> {
        let started = Instant::now();
        let scheduler = Scheduler::from_transactions(transactions, &self.config.scheduler)?;
        let max_parallelism = scheduler.schedule().max_parallelism;
        let workers = self.config.worker_threads.min(scheduler.len()).max(1);
        info!(workers, max_parallelism, "Executing batch");

        let errors = self.run_workers(&scheduler, workers);
        READY_QUEUE_DEPTH.set(0.0);

        let first_error = errors
            .into_iter()
            .next()
            .or_else(|| scheduler.finish().err().map(RuntimeError::from));
        if let Some(err) = first_error {
            BATCHES_ABORTED.inc();
            self.stats.write().batches_aborted += 1;
            error!(error = %err, remaining = scheduler.remaining(), "Batch aborted");
            return Err(err);
        }

        let results = scheduler.take_results();
        let timeline = scheduler.timeline();
        let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

        {
            let mut stats = self.stats.write();
            for result in &results {
                stats.record(result);
            }
            stats.batches_executed += 1;
            let batches = stats.batches_executed;
            stats.avg_batch_time_us = (stats.avg_batch_time_us * (batches - 1) + elapsed_us) / batches;
        }

        info!(
            tx_count = results.len(),
            elapsed_us,
            "Batch executed"
        );
        Ok(BatchOutcome {
            results,
            timeline,
            max_parallelism,
        })
    }

    fn run_workers(&self, scheduler: &Scheduler, workers: usize) -> Vec<RuntimeError> {
        thread::scope(|scope| {
            let mut errors = Vec::new();
            let mut handles = Vec::with_capacity(workers);

            for worker in 0..workers {
                let spawned = thread::Builder::new()
                    .name(format!("qc-worker-{worker}"))
                    .stack_size(self.config.worker_stack_size)
                    .spawn_scoped(scope, move || self.worker_loop(scheduler, worker));
                match spawned {
                    Ok(handle) => handles.push((worker, handle)),
                    Err(err) => {
                        scheduler.abort();
                        errors.push(RuntimeError::WorkerSpawn(err.to_string()));
                        break;
                    }
                }
            }

            for (worker, handle) in handles {
                match handle.join() {
                    Ok(Ok(executed)) => debug!(worker, executed, "Worker finished"),
                    Ok(Err(err)) => errors.push(err),
                    Err(_) => errors.push(RuntimeError::WorkerPanicked(worker)),
                }
            }
            errors
        })
    }

    fn worker_loop(&self, scheduler: &Scheduler, worker: usize) -> Result<usize, RuntimeError> {
        let _guard = AbortOnPanic(scheduler);
        let mut executed = 0;

        while let Some(tx) = scheduler.next_transaction() {
            READY_QUEUE_DEPTH.set(scheduler.ready_len() as f64);

            let result = match self.executor.execute(&tx) {
                Ok(result) => result,
                Err(err) => {
                    error!(worker, tx_id = tx.id, error = %err, "Worker stopped");
                    scheduler.abort();
                    return Err(err);
                }
            };
            if let Err(err) = scheduler.submit_result(result) {
                error!(worker, tx_id = tx.id, error = %err, "Result rejected");
                scheduler.abort();
                return Err(err.into());
            }
            executed += 1;
        }
        Ok(executed)
    }

    /// Execute one transaction outside any batch.
    ///
    /// # Errors
    ///
    /// Worker-fatal conditions only.
    pub fn run_transaction(&self, tx: &Transaction) -> Result<TransactionResult, RuntimeError> {
        let result = self.executor.execute(tx)?;
        self.stats.write().record(&result);
        Ok(result)
    }

    /// Re-execute one transaction under a received failure record.
    ///
    /// # Errors
    ///
    /// Worker-fatal conditions only.
    pub fn replay(
        &self,
        tx: &Transaction,
        record: FailureRecord,
    ) -> Result<TransactionResult, RuntimeError> {
        let result = self.executor.execute_with_record(tx, record)?;
        self.stats.write().record(&result);
        Ok(result)
    }
}

fn join_error(err: tokio::task::JoinError) -> RuntimeError {
    RuntimeError::Join(err.to_string())
}

#[async_trait]
impl<S: HeapStorage + 'static> ExecutionApi for ExecutionService<S> {
    async fn execute_batch(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<BatchOutcome, RuntimeError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.run_batch(transactions))
            .await
            .map_err(join_error)?
    }

    async fn execute_transaction(
        &self,
        tx: Transaction,
    ) -> Result<TransactionResult, RuntimeError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.run_transaction(&tx))
            .await
            .map_err(join_error)?
    }

    async fn replay_transaction(
        &self,
        tx: Transaction,
        record: FailureRecord,
    ) -> Result<TransactionResult, RuntimeError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.replay(&tx, record))
            .await
            .map_err(join_error)?
    }
}

/// Service over a fresh in-memory heap with default limits.
///
/// # Errors
///
/// Never in practice; default configuration always validates.
pub fn create_test_service(
    registry: ContractRegistry,
) -> Result<ExecutionService<InMemoryHeap>, RuntimeError> {
    ExecutionService::new(
        registry,
        Arc::new(InMemoryHeap::new()),
        ServiceConfig::default(),
    )
}

// =============================================================================
// TESTS
// =============================================================================
