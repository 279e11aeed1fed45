//! Domain invariants for Transaction Scheduling
//!
//! Checked by tests and by the scheduler's debug assertions.

use super::entities::{DependencyGraph, ExecutionSchedule, NodeTimeline, ParallelGroup};
use super::value_objects::NodeIndex;
use shared_types::TxId;
use std::collections::{HashMap, HashSet};

/// INVARIANT-1: Dependency Ordering
/// For every edge A -> B, A's completion was stamped before B was dispatched.
pub fn invariant_topological_order(timeline: &[NodeTimeline], graph: &DependencyGraph) -> bool {
    let by_tx: HashMap<TxId, &NodeTimeline> = timeline.iter().map(|t| (t.tx_id, t)).collect();

    graph.edges.iter().all(|edge| {
        match (by_tx.get(&edge.from), by_tx.get(&edge.to)) {
            (Some(from), Some(to)) => {
                from.completed_at != 0
                    && (to.dispatched_at == 0 || from.completed_at < to.dispatched_at)
            }
            _ => false,
        }
    })
}

/// INVARIANT-2: No Cycles
/// The dependency graph must be a DAG.
pub fn invariant_no_cycles(graph: &DependencyGraph) -> bool {
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();

    (0..graph.node_count())
        .all(|i| !has_cycle_dfs(graph, NodeIndex(i), &mut visited, &mut rec_stack))
}

fn has_cycle_dfs(
    graph: &DependencyGraph,
    node: NodeIndex,
    visited: &mut HashSet<NodeIndex>,
    rec_stack: &mut HashSet<NodeIndex>,
) -> bool {
    if rec_stack.contains(&node) {
        return true; // back edge
    }

    if !visited.insert(node) {
        return false;
    }

    rec_stack.insert(node);

    for &neighbor in &graph.adjacency[node.0] {
        if has_cycle_dfs(graph, neighbor, visited, rec_stack) {
            return true;
        }
    }

    rec_stack.remove(&node);
    false
}

/// INVARIANT-3: Parallel Safety
/// Transactions in the same parallel group have no edge between them.
pub fn invariant_parallel_safety(group: &ParallelGroup, graph: &DependencyGraph) -> bool {
    for i in 0..group.transactions.len() {
        for j in (i + 1)..group.transactions.len() {
            let tx_i = group.transactions[i];
            let tx_j = group.transactions[j];

            if graph.has_edge(tx_i, tx_j) || graph.has_edge(tx_j, tx_i) {
                return false;
            }
        }
    }

    true
}

/// INVARIANT-4: Completeness
/// All transactions are scheduled exactly once.
pub fn invariant_completeness(schedule: &ExecutionSchedule, graph: &DependencyGraph) -> bool {
    let flat = schedule.flatten();
    let scheduled: HashSet<TxId> = flat.iter().copied().collect();
    let all_tx: HashSet<TxId> = graph.transactions.iter().map(|tx| tx.id).collect();

    scheduled.len() == flat.len() && scheduled == all_tx
}

/// INVARIANT-5: Single Dispatch
/// Every transaction was dispatched and completed, each exactly once, with
/// distinct clock stamps.
pub fn invariant_single_dispatch(timeline: &[NodeTimeline]) -> bool {
    let mut stamps = HashSet::new();
    timeline.iter().all(|t| {
        t.dispatched_at != 0
            && t.dispatched_at < t.completed_at
            && stamps.insert(t.dispatched_at)
            && stamps.insert(t.completed_at)
    })
}
