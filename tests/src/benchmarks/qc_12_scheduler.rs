//! # QC-12 Transaction Scheduler Benchmarks
//!
//! Claims to validate:
//! - Conflict detection: O(n^2) pairwise, sub-millisecond for 500 transactions
//! - Graph construction plus Kahn's sort: O(V + E)
//! - Dispatch loop: next/submit overhead per transaction stays in the
//!   microsecond range
//!
//! Conditions:
//! - Fully independent batches (maximum parallelism)
//! - Hot-account batches (every transaction conflicts)
//! - Random mixes over a small account set

use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use qc_12_transaction_scheduler::{
    build_dependency_graph, detect_conflicts, kahns_topological_sort, Scheduler, SchedulerConfig,
};
use rand::Rng;
use shared_types::{
    AccessKey, AccountId, AppId, MemoryRegion, StatusCode, Transaction, TransactionResult, Verdict,
};
use std::time::Duration;

const SIZES: [usize; 3] = [50, 200, 500];

fn independent_batch(size: usize) -> Vec<Transaction> {
    (0..size as u64)
        .map(|i| {
            Transaction::new(i, AppId(i as u32), "noop", 10)
                .with_memory([MemoryRegion::new(AppId(i as u32), AccountId(i))])
        })
        .collect()
}

fn hot_account_batch(size: usize) -> Vec<Transaction> {
    (0..size as u64)
        .map(|i| {
            Transaction::new(i, AppId(i as u32), "noop", 10)
                .with_access([AccessKey::Account(AccountId(0))])
        })
        .collect()
}

fn random_batch(size: usize, accounts: u64) -> Vec<Transaction> {
    let mut rng = rand::thread_rng();
    (0..size as u64)
        .map(|i| {
            let from = rng.gen_range(0..accounts);
            let to = rng.gen_range(0..accounts);
            Transaction::new(i, AppId(i as u32), "transfer", 10)
                .with_access([AccessKey::Account(AccountId(from)), AccessKey::Account(AccountId(to))])
        })
        .collect()
}

fn bench_conflict_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-12-conflict-detection");

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));

        let independent = independent_batch(size);
        group.bench_with_input(BenchmarkId::new("independent", size), &independent, |b, txs| {
            b.iter(|| black_box(detect_conflicts(txs)))
        });

        let random = random_batch(size, 64);
        group.bench_with_input(BenchmarkId::new("random_64_accounts", size), &random, |b, txs| {
            b.iter(|| black_box(detect_conflicts(txs)))
        });
    }

    group.finish();
}

fn bench_graph_and_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-12-graph-construction");

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));

        let hot = hot_account_batch(size);
        group.bench_with_input(BenchmarkId::new("hot_account", size), &hot, |b, txs| {
            b.iter(|| {
                let graph = build_dependency_graph(txs.clone()).unwrap();
                black_box(kahns_topological_sort(&graph).unwrap())
            })
        });

        let random = random_batch(size, 64);
        group.bench_with_input(BenchmarkId::new("random_64_accounts", size), &random, |b, txs| {
            b.iter(|| {
                let graph = build_dependency_graph(txs.clone()).unwrap();
                black_box(kahns_topological_sort(&graph).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_dispatch_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-12-dispatch");
    group.measurement_time(Duration::from_secs(5));
    let config = SchedulerConfig::default();

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        let batch = random_batch(size, 16);

        group.bench_with_input(BenchmarkId::new("single_worker", size), &batch, |b, txs| {
            b.iter(|| {
                let scheduler = Scheduler::from_transactions(txs.clone(), &config).unwrap();
                while let Some(tx) = scheduler.next_transaction() {
                    let result =
                        TransactionResult::new(tx.id, Verdict::Completed(StatusCode::OK), "");
                    scheduler.submit_result(result).unwrap();
                }
                black_box(scheduler.take_results().len())
            })
        });
    }

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    bench_conflict_detection(c);
    bench_graph_and_sort(c);
    bench_dispatch_loop(c);
}
