//! Kahn's Topological Sort Algorithm
//!
//! O(V + E). Used at scheduler construction to reject cyclic graphs and to
//! report how much parallelism a batch offers.

use crate::domain::entities::{DependencyGraph, ExecutionSchedule, ParallelGroup};
use crate::domain::errors::SchedulerError;
use crate::domain::value_objects::NodeIndex;

/// Perform Kahn's topological sort on the dependency graph.
///
/// Returns an ExecutionSchedule with parallel groups. Transactions in the
/// same group have no path between them. Groups list transactions in batch
/// order.
pub fn kahns_topological_sort(
    graph: &DependencyGraph,
) -> Result<ExecutionSchedule, SchedulerError> {
    if graph.transactions.is_empty() {
        return Ok(ExecutionSchedule::new(vec![]));
    }

    let mut in_degree = graph.in_degree.clone();

    let mut queue: Vec<NodeIndex> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(i, _)| NodeIndex(i))
        .collect();

    let mut groups: Vec<ParallelGroup> = Vec::new();
    let mut scheduled_count = 0;

    while !queue.is_empty() {
        let current_group = std::mem::take(&mut queue);
        scheduled_count += current_group.len();

        let mut next_queue: Vec<NodeIndex> = Vec::new();
        for node in &current_group {
            for &neighbor in &graph.adjacency[node.0] {
                let degree = &mut in_degree[neighbor.0];
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    next_queue.push(neighbor);
                }
            }
        }

        let ids = current_group
            .iter()
            .map(|idx| graph.transactions[idx.0].id)
            .collect();
        groups.push(ParallelGroup::new(groups.len(), ids));

        // Batch order keeps the preview deterministic
        next_queue.sort();
        queue = next_queue;
    }

    if scheduled_count < graph.transactions.len() {
        return Err(SchedulerError::CycleDetected);
    }

    Ok(ExecutionSchedule::new(groups))
}
