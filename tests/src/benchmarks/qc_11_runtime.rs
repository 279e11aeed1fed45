//! # QC-11 Contract Runtime Benchmarks
//!
//! Claims to validate:
//! - Host primitive overhead (poll, load, store) stays in nanoseconds
//! - Nested invocation cost is linear in depth
//! - Replay of a flagged timeout finishes in a fraction of the original
//!   budget
//! - Batch throughput with one and four workers
//!
//! Conditions:
//! - Deep nesting (up to 32 levels)
//! - Hot-account batches where every transaction is serialized

use crate::contracts::*;
use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use qc_11_contract_runtime::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn bench_single_transaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-11-transaction");
    let storage = Arc::new(InMemoryHeap::new());
    let executor = executor(Arc::clone(&storage));
    seed_balance(&storage, 1, i64::MAX / 2);

    let transfer = transfer_tx(1, 1, 2, 1);
    group.bench_function("transfer_with_deferred_ledger", |b| {
        b.iter(|| black_box(executor.execute(&transfer).unwrap()))
    });

    let rejected = transfer_tx(2, 3, 2, 1);
    group.bench_function("reverted_transfer", |b| {
        b.iter(|| black_box(executor.execute(&rejected).unwrap()))
    });

    let contained = guard_tx(3, 1, "divide 1 0");
    group.bench_function("contained_nested_fault", |b| {
        b.iter(|| black_box(executor.execute(&contained).unwrap()))
    });

    group.finish();
}

fn bench_nesting(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-11-nesting");
    let executor = executor(Arc::new(InMemoryHeap::new()));

    for levels in [1u32, 8, 32] {
        let tx = fib_tx(1, 1_000, levels, 8);
        group.bench_with_input(BenchmarkId::new("fib_8_per_level", levels), &tx, |b, tx| {
            b.iter(|| black_box(executor.execute(tx).unwrap()))
        });
    }

    group.finish();
}

fn bench_flagged_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-11-replay");
    group.measurement_time(Duration::from_secs(5));
    let executor = executor(Arc::new(InMemoryHeap::new()));

    let tx = fib_tx(1, 40, 4, 40);
    let Ok(original) = executor.execute(&tx) else {
        return;
    };
    group.bench_function("replica_with_record", |b| {
        b.iter(|| {
            black_box(
                executor
                    .execute_with_record(&tx, original.failure_record.clone())
                    .unwrap(),
            )
        })
    });

    group.finish();
}

fn bench_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-11-batch");
    group.measurement_time(Duration::from_secs(10));

    for workers in [1usize, 4] {
        let config = ServiceConfig {
            worker_threads: workers,
            ..Default::default()
        };
        let service =
            ExecutionService::new(registry(), Arc::new(InMemoryHeap::new()), config).unwrap();

        let independent: Vec<_> = (0..256u64)
            .map(|i| vault_tx(i, i, &format!("deposit {i} 1")))
            .collect();
        group.throughput(Throughput::Elements(independent.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("vault_deposits", workers),
            &independent,
            |b, batch| b.iter(|| black_box(service.run_batch(batch.clone()).unwrap())),
        );

        seed_balance(service.storage(), 0, i64::MAX / 2);
        let hot: Vec<_> = (0..256u64).map(|i| transfer_tx(i, 0, i % 8 + 1, 1)).collect();
        group.bench_with_input(BenchmarkId::new("hot_account_transfers", workers), &hot, |b, batch| {
            b.iter(|| black_box(service.run_batch(batch.clone()).unwrap()))
        });
    }

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    bench_single_transaction(c);
    bench_nesting(c);
    bench_flagged_replay(c);
    bench_batches(c);
}
