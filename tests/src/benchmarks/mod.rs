//! # Subsystem Benchmarks
//!
//! Criterion benchmarks per subsystem, registered from
//! `benches/subsystem_benchmarks.rs`.

pub mod qc_11_runtime;
pub mod qc_12_scheduler;
