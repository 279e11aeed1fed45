//! Blocking FIFO of ready dependency nodes.
//!
//! The only lock workers contend on. Held for O(1) push/pop, never across
//! contract execution.

use crate::domain::value_objects::NodeIndex;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<NodeIndex>,
    closed: bool,
}

/// FIFO ready queue with blocking pop.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a node and wake one waiting worker.
    pub fn push(&self, node: NodeIndex) {
        self.state.lock().items.push_back(node);
        self.available.notify_one();
    }

    /// Enqueue many nodes under one lock acquisition.
    pub fn extend(&self, nodes: impl IntoIterator<Item = NodeIndex>) {
        let mut state = self.state.lock();
        let before = state.items.len();
        state.items.extend(nodes);
        let added = state.items.len() - before;
        drop(state);
        for _ in 0..added {
            self.available.notify_one();
        }
    }

    /// Block until a node is available. Returns `None` once the queue is
    /// closed and drained.
    pub fn pop(&self) -> Option<NodeIndex> {
        let mut state = self.state.lock();
        loop {
            if let Some(node) = state.items.pop_front() {
                return Some(node);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Non-blocking pop.
    pub fn try_pop(&self) -> Option<NodeIndex> {
        self.state.lock().items.pop_front()
    }

    /// Stop accepting waits; every blocked `pop` returns once items run out.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    /// Close and discard anything still queued.
    pub fn close_and_clear(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.items.clear();
        drop(state);
        self.available.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
