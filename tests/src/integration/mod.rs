//! # Integration Scenarios
//!
//! Batches flowing through qc-12 scheduling into qc-11 execution, with the
//! fixture applications from [`crate::contracts`].

pub mod batch_execution;
pub mod critical_areas;
pub mod deferred_calls;
