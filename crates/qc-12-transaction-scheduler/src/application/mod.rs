//! Application layer for Transaction Scheduling
//!
//! The runtime scheduler and the ready queue it dispatches from.

pub mod ready_queue;
pub mod scheduler;

pub use ready_queue::ReadyQueue;
pub use scheduler::Scheduler;
