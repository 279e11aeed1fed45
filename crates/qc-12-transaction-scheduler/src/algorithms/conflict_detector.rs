//! Conflict Detector
//!
//! Pairwise overlap of precomputed access lists.

use crate::domain::value_objects::{conflict_between, Conflict};
use shared_types::Transaction;

/// Detect all conflicts between a set of transactions.
///
/// Returns conflicts ordered by transaction pair, earlier batch position
/// first in each pair.
pub fn detect_conflicts(transactions: &[Transaction]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for i in 0..transactions.len() {
        for j in (i + 1)..transactions.len() {
            let tx1 = &transactions[i];
            let tx2 = &transactions[j];

            if let Some(kind) = conflict_between(tx1, tx2) {
                conflicts.push(Conflict {
                    tx1: tx1.id,
                    tx2: tx2.id,
                    kind,
                });
            }
        }
    }

    conflicts
}
