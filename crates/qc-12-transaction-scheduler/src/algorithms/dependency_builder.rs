//! Dependency Graph Builder
//!
//! Turns a batch of transactions with precomputed access lists into a DAG.
//! Edges always point from the earlier batch position to the later one, so
//! the result is acyclic by construction and conflicting pairs are never
//! ready at the same time.

use crate::algorithms::conflict_detector::detect_conflicts;
use crate::domain::entities::{Dependency, DependencyGraph};
use crate::domain::errors::SchedulerError;
use shared_types::Transaction;

/// Build a dependency graph from transactions in batch order.
pub fn build_dependency_graph(
    transactions: Vec<Transaction>,
) -> Result<DependencyGraph, SchedulerError> {
    let conflicts = detect_conflicts(&transactions);

    let mut graph = DependencyGraph::new();
    for tx in transactions {
        graph.add_node(tx)?;
    }

    for conflict in conflicts {
        graph.add_edge(Dependency::new(conflict.tx1, conflict.tx2, conflict.kind))?;
    }

    Ok(graph)
}
