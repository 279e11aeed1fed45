//! Dependency-aware transaction scheduler
//!
//! Workers call [`Scheduler::next_transaction`] to obtain work and
//! [`Scheduler::submit_result`] once per transaction they ran. Submitting a
//! result decrements the in-degree of every dependent; the one decrement that
//! reaches zero enqueues that dependent.
//!
//! The arena and the id index are built once and never structurally mutated
//! afterwards, so lookups from many threads need no lock. Completed nodes are
//! retired in place.

use crate::algorithms::{build_dependency_graph, kahns_topological_sort};
use crate::application::ready_queue::ReadyQueue;
use crate::config::SchedulerConfig;
use crate::domain::entities::{DependencyGraph, DependencyNode, ExecutionSchedule, NodeTimeline};
use crate::domain::errors::SchedulerError;
use crate::domain::value_objects::{NodeIndex, NodeState};
use crate::ports::inbound::TransactionScheduler;
use parking_lot::Mutex;
use shared_types::{Transaction, TransactionResult, TxId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Scheduler over one batch of transactions.
#[derive(Debug)]
pub struct Scheduler {
    nodes: Vec<DependencyNode>,
    index: HashMap<TxId, NodeIndex>,
    ready: ReadyQueue,
    remaining: AtomicUsize,
    clock: AtomicU64,
    aborted: AtomicBool,
    fault: Mutex<Option<SchedulerError>>,
    schedule: ExecutionSchedule,
}

impl Scheduler {
    /// Build a scheduler from a precomputed graph with default limits.
    pub fn new(graph: DependencyGraph) -> Result<Self, SchedulerError> {
        Self::with_config(graph, &SchedulerConfig::default())
    }

    /// Build a scheduler from a precomputed graph.
    ///
    /// Rejects oversized batches, oversized graphs and cycles.
    pub fn with_config(
        graph: DependencyGraph,
        config: &SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        config.validate_batch(graph.node_count(), graph.edge_count())?;
        let schedule = kahns_topological_sort(&graph)?;

        let DependencyGraph {
            transactions,
            index,
            adjacency,
            in_degree,
            ..
        } = graph;

        let nodes: Vec<DependencyNode> = transactions
            .into_iter()
            .zip(adjacency)
            .zip(in_degree)
            .map(|((tx, dependents), degree)| DependencyNode::new(tx, dependents, degree))
            .collect();

        let scheduler = Self {
            remaining: AtomicUsize::new(nodes.len()),
            nodes,
            index,
            ready: ReadyQueue::new(),
            clock: AtomicU64::new(0),
            aborted: AtomicBool::new(false),
            fault: Mutex::new(None),
            schedule,
        };

        let roots: Vec<NodeIndex> = (0..scheduler.nodes.len())
            .map(NodeIndex)
            .filter(|idx| scheduler.nodes[idx.0].in_degree() == 0)
            .collect();
        for idx in &roots {
            scheduler.nodes[idx.0].transition(NodeState::Pending, NodeState::Ready);
        }
        scheduler.ready.extend(roots);

        if scheduler.nodes.is_empty() {
            scheduler.ready.close();
        }

        info!(
            tx_count = scheduler.nodes.len(),
            parallel_groups = scheduler.schedule.parallel_groups.len(),
            max_parallelism = scheduler.schedule.max_parallelism,
            "Scheduler ready"
        );

        Ok(scheduler)
    }

    /// Build the graph from the transactions' access lists, then schedule.
    pub fn from_transactions(
        transactions: Vec<Transaction>,
        config: &SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        config.validate_batch(transactions.len(), 0)?;
        let graph = build_dependency_graph(transactions)?;
        Self::with_config(graph, config)
    }

    /// Block until a transaction with no unresolved predecessors is ready.
    ///
    /// Returns `None` once every transaction has completed or the scheduler
    /// was aborted. Check [`Scheduler::finish`] afterwards to tell the two
    /// apart.
    pub fn next_transaction(&self) -> Option<Arc<Transaction>> {
        let idx = self.ready.pop()?;
        self.dispatch(idx)
    }

    /// Non-blocking variant of [`Scheduler::next_transaction`].
    pub fn try_next_transaction(&self) -> Option<Arc<Transaction>> {
        let idx = self.ready.try_pop()?;
        self.dispatch(idx)
    }

    fn dispatch(&self, idx: NodeIndex) -> Option<Arc<Transaction>> {
        let node = &self.nodes[idx.0];
        if !node.transition(NodeState::Ready, NodeState::Running) {
            let state = node.state();
            warn!(tx_id = node.tx_id(), state = ?state, "Dequeued node not ready");
            self.fault
                .lock()
                .get_or_insert(SchedulerError::NotReady {
                    tx_id: node.tx_id(),
                    state: state_name(state),
                });
            self.abort();
            return None;
        }
        node.stamp_dispatched(self.tick());
        debug!(tx_id = node.tx_id(), "Dispatched transaction");
        node.payload()
    }

    /// Record a completed transaction and release its dependents.
    ///
    /// Must be called exactly once per dispatched transaction, by the worker
    /// that ran it.
    pub fn submit_result(&self, result: TransactionResult) -> Result<(), SchedulerError> {
        let idx = *self
            .index
            .get(&result.tx_id)
            .ok_or(SchedulerError::UnknownTransaction(result.tx_id))?;
        let node = &self.nodes[idx.0];

        let state = node.state();
        if state != NodeState::Running {
            return Err(SchedulerError::NotRunning {
                tx_id: result.tx_id,
                state: state_name(state),
            });
        }

        node.stamp_completed(self.tick());

        let mut released = Vec::new();
        for &dep in node.dependents() {
            let dependent = &self.nodes[dep.0];
            if dependent.release_one()? {
                dependent.transition(NodeState::Pending, NodeState::Ready);
                released.push(dep);
            }
        }

        debug!(
            tx_id = result.tx_id,
            verdict = %result.verdict,
            released = released.len(),
            "Transaction completed"
        );

        node.retire(result);
        if !self.aborted.load(Ordering::Acquire) {
            self.ready.extend(released);
        }

        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            info!(tx_count = self.nodes.len(), "All transactions completed");
            self.ready.close();
        }

        Ok(())
    }

    /// Stop dispatching and wake every blocked worker.
    pub fn abort(&self) {
        if !self.aborted.swap(true, Ordering::AcqRel) {
            warn!(
                remaining = self.remaining.load(Ordering::Acquire),
                "Scheduler aborted"
            );
        }
        self.ready.close_and_clear();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Verify the batch ran to completion once the workers have stopped.
    ///
    /// # Errors
    ///
    /// The integrity error that stopped dispatch, or
    /// [`SchedulerError::Incomplete`] if transactions were left without a
    /// result.
    pub fn finish(&self) -> Result<(), SchedulerError> {
        if let Some(fault) = self.fault.lock().clone() {
            return Err(fault);
        }
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(SchedulerError::Incomplete { remaining }),
        }
    }

    /// Transactions not yet completed.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of transactions currently waiting in the ready queue.
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    pub fn state_of(&self, tx_id: TxId) -> Option<NodeState> {
        self.index.get(&tx_id).map(|idx| self.nodes[idx.0].state())
    }

    /// Parallelism preview computed at construction.
    pub fn schedule(&self) -> &ExecutionSchedule {
        &self.schedule
    }

    /// Dispatch and completion stamps, in batch order.
    pub fn timeline(&self) -> Vec<NodeTimeline> {
        self.nodes
            .iter()
            .map(|node| NodeTimeline {
                tx_id: node.tx_id(),
                dispatched_at: node.dispatched_at(),
                completed_at: node.completed_at(),
            })
            .collect()
    }

    /// Collect the submitted results in batch order.
    pub fn take_results(&self) -> Vec<TransactionResult> {
        self.nodes
            .iter()
            .filter_map(DependencyNode::take_result)
            .collect()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl TransactionScheduler for Scheduler {
    fn next_transaction(&self) -> Option<Arc<Transaction>> {
        Scheduler::next_transaction(self)
    }

    fn submit_result(&self, result: TransactionResult) -> Result<(), SchedulerError> {
        Scheduler::submit_result(self, result)
    }

    fn abort(&self) {
        Scheduler::abort(self);
    }
}

fn state_name(state: NodeState) -> &'static str {
    match state {
        NodeState::Pending => "Pending",
        NodeState::Ready => "Ready",
        NodeState::Running => "Running",
        NodeState::Retired => "Retired",
    }
}
