//! Configuration for Transaction Scheduling

use crate::domain::errors::SchedulerError;
use serde::{Deserialize, Serialize};

/// Scheduler limits
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum transactions in one batch
    pub max_batch_size: usize,
    /// Maximum edges in dependency graph
    pub max_edge_count: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 10_000,
            max_edge_count: 1_000_000,
        }
    }
}

impl SchedulerConfig {
    /// Reject batches exceeding the configured limits.
    pub fn validate_batch(&self, size: usize, edges: usize) -> Result<(), SchedulerError> {
        if size > self.max_batch_size {
            return Err(SchedulerError::BatchTooLarge {
                size,
                max: self.max_batch_size,
            });
        }
        if edges > self.max_edge_count {
            return Err(SchedulerError::TooManyEdges {
                count: edges,
                max: self.max_edge_count,
            });
        }
        Ok(())
    }
}
