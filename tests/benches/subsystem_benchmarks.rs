//! # Quantum-Chain Subsystem Benchmarks
//!
//! | Subsystem | Claim | Target |
//! |-----------|-------|--------|
//! | qc-12 Transaction Scheduler | Conflict detection for 500 txs | < 1ms |
//! | qc-12 Transaction Scheduler | Dispatch overhead | < 5us per tx |
//! | qc-11 Contract Runtime | Transfer with deferred call | < 50us |
//! | qc-11 Contract Runtime | Replica of a flagged timeout | < 1ms |

use criterion::{criterion_group, criterion_main, Criterion};
use qc_tests::benchmarks::{qc_11_runtime, qc_12_scheduler};

fn scheduler_benchmarks(c: &mut Criterion) {
    qc_12_scheduler::register_benchmarks(c);
}

fn runtime_benchmarks(c: &mut Criterion) {
    qc_11_runtime::register_benchmarks(c);
}

criterion_group!(benches, scheduler_benchmarks, runtime_benchmarks);
criterion_main!(benches);
