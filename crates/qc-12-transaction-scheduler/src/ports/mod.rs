//! Ports module for Transaction Scheduling
//!
//! Defines the inbound port workers drive the scheduler through.

pub mod inbound;

pub use inbound::TransactionScheduler;
