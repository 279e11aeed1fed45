//! Core entities for Transaction Scheduling
//!
//! `DependencyGraph` is the construction-time view of a batch. `DependencyNode`
//! is the runtime view the scheduler mutates from many worker threads.

use super::errors::SchedulerError;
use super::value_objects::{DependencyKind, NodeIndex, NodeState};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_types::{Transaction, TransactionResult, TxId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

/// Dependency graph edge
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Transaction that must complete first
    pub from: TxId,
    /// Transaction that must wait
    pub to: TxId,
    /// Type of dependency
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn new(from: TxId, to: TxId, kind: DependencyKind) -> Self {
        Self { from, to, kind }
    }
}

/// Dependency graph for one scheduling batch.
///
/// Nodes live in insertion (batch) order; `NodeIndex` is the position.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// All transactions, by node index
    pub transactions: Vec<Transaction>,
    /// Transaction id -> node index
    pub index: HashMap<TxId, NodeIndex>,
    /// All edges (dependencies)
    pub edges: Vec<Dependency>,
    /// Adjacency list: from -> [to, to, ...]
    pub adjacency: Vec<Vec<NodeIndex>>,
    /// In-degree count for each node
    pub in_degree: Vec<usize>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction node to the graph
    pub fn add_node(&mut self, tx: Transaction) -> Result<NodeIndex, SchedulerError> {
        if self.index.contains_key(&tx.id) {
            return Err(SchedulerError::DuplicateTransaction(tx.id));
        }
        let idx = NodeIndex(self.transactions.len());
        self.index.insert(tx.id, idx);
        self.transactions.push(tx);
        self.adjacency.push(Vec::new());
        self.in_degree.push(0);
        Ok(idx)
    }

    /// Add a dependency edge. Returns `false` if the edge already existed.
    pub fn add_edge(&mut self, dep: Dependency) -> Result<bool, SchedulerError> {
        if dep.from == dep.to {
            return Err(SchedulerError::SelfDependency(dep.from));
        }
        let from = self.require(dep.from)?;
        let to = self.require(dep.to)?;

        if self.adjacency[from.0].contains(&to) {
            return Ok(false);
        }

        self.adjacency[from.0].push(to);
        self.in_degree[to.0] += 1;
        self.edges.push(dep);
        Ok(true)
    }

    /// Check if an edge exists from -> to
    pub fn has_edge(&self, from: TxId, to: TxId) -> bool {
        match (self.index.get(&from), self.index.get(&to)) {
            (Some(from), Some(to)) => self.adjacency[from.0].contains(to),
            _ => false,
        }
    }

    pub fn node_index(&self, tx_id: TxId) -> Option<NodeIndex> {
        self.index.get(&tx_id).copied()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.transactions.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn require(&self, tx_id: TxId) -> Result<NodeIndex, SchedulerError> {
        self.node_index(tx_id)
            .ok_or(SchedulerError::UnknownTransaction(tx_id))
    }
}

/// Runtime node in the scheduler arena.
///
/// The adjacency list is frozen at construction. Workers only touch the
/// atomic in-degree, the state byte, the stamps and the two O(1) slots.
#[derive(Debug)]
pub struct DependencyNode {
    tx_id: TxId,
    payload: Mutex<Option<Arc<Transaction>>>,
    dependents: Vec<NodeIndex>,
    in_degree: AtomicUsize,
    state: AtomicU8,
    dispatched_at: AtomicU64,
    completed_at: AtomicU64,
    result: Mutex<Option<TransactionResult>>,
}

impl DependencyNode {
    pub fn new(tx: Transaction, dependents: Vec<NodeIndex>, in_degree: usize) -> Self {
        Self {
            tx_id: tx.id,
            payload: Mutex::new(Some(Arc::new(tx))),
            dependents,
            in_degree: AtomicUsize::new(in_degree),
            state: AtomicU8::new(NodeState::Pending as u8),
            dispatched_at: AtomicU64::new(0),
            completed_at: AtomicU64::new(0),
            result: Mutex::new(None),
        }
    }

    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    pub fn dependents(&self) -> &[NodeIndex] {
        &self.dependents
    }

    pub fn in_degree(&self) -> usize {
        self.in_degree.load(Ordering::Acquire)
    }

    pub fn state(&self) -> NodeState {
        NodeState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Atomically move `from -> to`. Returns `false` if the node was elsewhere.
    pub fn transition(&self, from: NodeState, to: NodeState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Resolve one predecessor. Returns `true` for the single caller that
    /// brings the in-degree to zero.
    pub fn release_one(&self) -> Result<bool, SchedulerError> {
        let mut current = self.in_degree.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return Err(SchedulerError::InDegreeUnderflow(self.tx_id));
            }
            match self.in_degree.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(current == 1),
                Err(actual) => current = actual,
            }
        }
    }

    /// The transaction, while the node has not been retired
    pub fn payload(&self) -> Option<Arc<Transaction>> {
        self.payload.lock().clone()
    }

    /// Store the result and drop the transaction payload.
    pub fn retire(&self, result: TransactionResult) {
        *self.result.lock() = Some(result);
        self.payload.lock().take();
        self.state.store(NodeState::Retired as u8, Ordering::Release);
    }

    pub fn take_result(&self) -> Option<TransactionResult> {
        self.result.lock().take()
    }

    pub fn stamp_dispatched(&self, tick: u64) {
        self.dispatched_at.store(tick, Ordering::Release);
    }

    pub fn stamp_completed(&self, tick: u64) {
        self.completed_at.store(tick, Ordering::Release);
    }

    /// Logical dispatch time (0 = never dispatched)
    pub fn dispatched_at(&self) -> u64 {
        self.dispatched_at.load(Ordering::Acquire)
    }

    /// Logical completion time (0 = not completed)
    pub fn completed_at(&self) -> u64 {
        self.completed_at.load(Ordering::Acquire)
    }
}

/// Dispatch/completion stamps of one transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTimeline {
    pub tx_id: TxId,
    pub dispatched_at: u64,
    pub completed_at: u64,
}

/// A group of transactions that can execute in parallel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelGroup {
    /// Group sequence number
    pub group_id: usize,
    /// Transactions in this group (can run concurrently)
    pub transactions: Vec<TxId>,
}

impl ParallelGroup {
    pub fn new(group_id: usize, transactions: Vec<TxId>) -> Self {
        Self {
            group_id,
            transactions,
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Level-by-level preview of a batch: what could run concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSchedule {
    /// Ordered groups for parallel execution
    pub parallel_groups: Vec<ParallelGroup>,
    /// Total transactions scheduled
    pub total_transactions: usize,
    /// Maximum parallelism achieved
    pub max_parallelism: usize,
}

impl ExecutionSchedule {
    pub fn new(groups: Vec<ParallelGroup>) -> Self {
        let total = groups.iter().map(|g| g.len()).sum();
        let max_par = groups.iter().map(|g| g.len()).max().unwrap_or(0);

        Self {
            parallel_groups: groups,
            total_transactions: total,
            max_parallelism: max_par,
        }
    }

    /// Get a flattened list of transactions in execution order
    pub fn flatten(&self) -> Vec<TxId> {
        self.parallel_groups
            .iter()
            .flat_map(|g| g.transactions.iter().copied())
            .collect()
    }
}
