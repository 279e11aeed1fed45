//! # Failure Manager
//!
//! Turns timing-dependent faults into reproducible verdicts.
//!
//! Invocation ids are assigned in call order, starting at 1 for the root, and
//! are identical across attempts of the same transaction. An invocation
//! flagged in the [`FailureRecord`] gets a drastically reduced budget so it
//! fails again, quickly and for the same reason. Everything else runs with
//! generous budgets.

use crate::config::RuntimeConfig;
use crate::errors::Fault;
use shared_types::{FailureReason, FailureRecord, Gas, InvocationId};
use std::time::Duration;
use tracing::debug;

/// Per-attempt invocation bookkeeping.
#[derive(Debug, Clone)]
pub struct FailureManager {
    record: FailureRecord,
    observed: Option<(InvocationId, FailureReason)>,
    next_id: InvocationId,
    depth: u32,
    max_depth: u32,
    default_time_coefficient_ns: u64,
    flagged_time_coefficient_ns: u64,
    default_stack_size: usize,
    flagged_stack_size: usize,
}

impl FailureManager {
    /// Start an attempt under `record` (empty on a first attempt).
    #[must_use]
    pub fn new(record: FailureRecord, config: &RuntimeConfig) -> Self {
        Self {
            record,
            observed: None,
            next_id: 1,
            depth: 0,
            max_depth: config.max_call_depth,
            default_time_coefficient_ns: config.default_time_coefficient_ns,
            flagged_time_coefficient_ns: config.flagged_time_coefficient_ns,
            default_stack_size: config.default_stack_size,
            flagged_stack_size: config.flagged_stack_size,
        }
    }

    /// Enter a new invocation and assign its id.
    ///
    /// # Errors
    ///
    /// `CallDepthExceeded` past the configured ceiling; no id is consumed.
    pub fn next_invocation(&mut self) -> Result<InvocationId, Fault> {
        let depth = self.depth + 1;
        if depth > self.max_depth {
            return Err(Fault::CallDepthExceeded {
                depth,
                max: self.max_depth,
            });
        }
        self.depth = depth;
        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }

    /// Leave the current invocation.
    pub fn complete_invocation(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Current nesting depth (root = 1).
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Invocations started so far in this attempt.
    #[must_use]
    pub fn invocations(&self) -> u64 {
        self.next_id - 1
    }

    /// Recorded failure for `id`, if flagged.
    #[must_use]
    pub fn flagged(&self, id: InvocationId) -> Option<FailureReason> {
        self.record.get(id)
    }

    /// CPU-time budget for `gas` units in invocation `id`.
    #[must_use]
    pub fn get_exec_time(&self, id: InvocationId, gas: Gas) -> Duration {
        let coefficient = match self.flagged(id) {
            Some(FailureReason::TimeExhausted) => self.flagged_time_coefficient_ns,
            _ => self.default_time_coefficient_ns,
        };
        Duration::from_nanos(gas.saturating_mul(coefficient))
    }

    /// Stack budget for invocation `id`.
    #[must_use]
    pub fn get_stack_size(&self, id: InvocationId) -> usize {
        match self.flagged(id) {
            Some(FailureReason::StackExhausted) => self.flagged_stack_size,
            _ => self.default_stack_size,
        }
    }

    /// Note a real fault. Only the first unflagged one per attempt is kept.
    ///
    /// Returns `true` if this fault was recorded.
    pub fn record_failure(&mut self, id: InvocationId, reason: FailureReason) -> bool {
        if self.observed.is_some() || self.record.get(id).is_some() {
            return false;
        }
        debug!(invocation = id, ?reason, "Recorded new failure");
        self.observed = Some((id, reason));
        true
    }

    /// The new fault observed in this attempt, if any.
    #[must_use]
    pub fn observed(&self) -> Option<(InvocationId, FailureReason)> {
        self.observed
    }

    /// Record for the next attempt: the input record plus the new fault.
    #[must_use]
    pub fn into_record(self) -> FailureRecord {
        let mut record = self.record;
        if let Some((id, reason)) = self.observed {
            record.insert(id, reason);
        }
        record
    }
}
