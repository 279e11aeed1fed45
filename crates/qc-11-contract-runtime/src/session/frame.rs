//! # Invocation Frames
//!
//! One frame per running invocation: its checkpoint (journal and area
//! marks), its resource guard, and the calls it deferred.

use crate::errors::Fault;
use shared_types::{AppId, ChunkId, Gas, InvocationId};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// CPU-time budget of one invocation, checked at polling points.
#[derive(Debug, Clone, Copy)]
pub struct Watchdog {
    started: Instant,
    budget: Duration,
}

impl Watchdog {
    /// Start the clock.
    #[must_use]
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// Returns true once the budget has run out.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.started.elapsed() > self.budget
    }
}

/// A call queued by an invocation, run after it completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredCall {
    /// Target application.
    pub app: AppId,
    /// Request text.
    pub request: String,
    /// Forwarded gas.
    pub gas: Gas,
}

/// Checkpoint and guard state of one running invocation.
#[derive(Debug)]
pub(crate) struct Frame {
    pub id: InvocationId,
    pub app: AppId,
    pub depth: u32,
    pub watchdog: Watchdog,
    pub stack_limit: usize,
    pub stack_used: usize,
    pub journal_mark: usize,
    pub area_mark: usize,
    pub active_on_entry: Option<ChunkId>,
    pub deferred: VecDeque<DeferredCall>,
    /// First fault delivered to this invocation. Once set, the invocation
    /// unwinds no matter what the dispatcher returns.
    pub fault: Option<Fault>,
}

impl Frame {
    /// Reserve stack bytes against the frame budget.
    pub fn reserve_stack(&mut self, bytes: usize) -> Result<(), Fault> {
        let available = self.stack_limit.saturating_sub(self.stack_used);
        if bytes > available {
            return Err(Fault::StackExhausted {
                requested: bytes,
                available,
            });
        }
        self.stack_used += bytes;
        Ok(())
    }

    pub fn release_stack(&mut self, bytes: usize) {
        self.stack_used = self.stack_used.saturating_sub(bytes);
    }
}
