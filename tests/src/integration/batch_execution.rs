//! # Batch Execution Flow
//!
//! Tests that qc-12-transaction-scheduler and qc-11-contract-runtime work
//! together on whole batches.
//!
//! ## Flow Tested:
//!
//! 1. **Scheduling**: conflicting transactions never overlap, batch order wins
//! 2. **Execution**: every transaction gets exactly one verdict
//! 3. **Commit**: only completed transactions reach the heap
//! 4. **Abort**: a worker-fatal fault stops the whole batch

#[cfg(test)]
mod tests {
    use crate::contracts::*;
    use qc_11_contract_runtime::prelude::*;
    use qc_12_transaction_scheduler::NodeTimeline;
    use std::sync::Arc;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn service() -> ExecutionService<InMemoryHeap> {
        qc_telemetry::init_test_logging();
        create_test_service(registry()).unwrap()
    }

    fn service_with_workers(workers: usize) -> ExecutionService<InMemoryHeap> {
        let config = ServiceConfig {
            worker_threads: workers,
            ..Default::default()
        };
        ExecutionService::new(registry(), Arc::new(InMemoryHeap::new()), config).unwrap()
    }

    fn balance(service: &ExecutionService<InMemoryHeap>, account: u64) -> Option<i64> {
        read_i64(service.storage(), balance_chunk(account), 0)
    }

    fn stamps(timeline: &[NodeTimeline], tx_id: u64) -> (u64, u64) {
        let entry = timeline.iter().find(|t| t.tx_id == tx_id).unwrap();
        (entry.dispatched_at, entry.completed_at)
    }

    // =========================================================================
    // BATCH TESTS
    // =========================================================================

    #[test]
    fn test_transfers_apply_in_batch_order() {
        let service = service();
        seed_balance(service.storage(), 1, 100);

        let batch = vec![
            transfer_tx(1, 1, 2, 30),
            transfer_tx(2, 2, 3, 20),
            transfer_tx(3, 1, 3, 50),
            transfer_tx(4, 3, 1, 70),
        ];
        let outcome = service.run_batch(batch.clone()).unwrap();

        assert_eq!(outcome.succeeded(), 4);
        assert_eq!(balance(&service, 1), Some(90));
        assert_eq!(balance(&service, 2), Some(10));
        assert_eq!(balance(&service, 3), Some(0));
        assert!(check_all_invariants(&batch, &outcome, &service.config().runtime).is_valid());
    }

    #[test]
    fn test_conflicting_transactions_never_overlap() {
        let service = service_with_workers(4);
        seed_balance(service.storage(), 1, 10);

        let outcome = service
            .run_batch(vec![
                transfer_tx(1, 1, 2, 5),
                transfer_tx(2, 2, 3, 5),
                transfer_tx(3, 3, 4, 5),
            ])
            .unwrap();

        let (_, first_done) = stamps(&outcome.timeline, 1);
        let (second_start, second_done) = stamps(&outcome.timeline, 2);
        let (third_start, _) = stamps(&outcome.timeline, 3);
        assert!(first_done < second_start);
        assert!(second_done < third_start);
        assert_eq!(outcome.max_parallelism, 1);
        assert_eq!(balance(&service, 4), Some(5));
    }

    #[test]
    fn test_independent_vaults_run_in_parallel_groups() {
        let service = service_with_workers(4);
        let batch: Vec<_> = (1..=8)
            .map(|account| {
                Transaction::new(account, VAULT, format!("deposit {account} {account}"), 1_000)
                    .with_memory([MemoryRegion::new(VAULT, AccountId(account))])
            })
            .collect();

        // Same app on every transaction still serializes them.
        let outcome = service.run_batch(batch).unwrap();
        assert_eq!(outcome.succeeded(), 8);
        assert_eq!(outcome.max_parallelism, 1);

        let batch: Vec<_> = (10..=13)
            .map(|id| mint_tx(id, id, 1))
            .chain((20..=23).map(|id| vault_tx(id, id, &format!("deposit {id} 1"))))
            .collect();
        let outcome = service.run_batch(batch).unwrap();
        assert_eq!(outcome.succeeded(), 8);
        assert_eq!(outcome.max_parallelism, 2);
    }

    #[test]
    fn test_revert_commits_nothing() {
        let service = service();
        seed_balance(service.storage(), 1, 10);

        let outcome = service
            .run_batch(vec![transfer_tx(1, 1, 2, 50), transfer_tx(2, 9, 2, 1)])
            .unwrap();

        let short = outcome.result(1).unwrap();
        assert_eq!(short.verdict, Verdict::Completed(StatusCode::REVERTED));
        assert_eq!(short.response, "insufficient funds");
        let unknown = outcome.result(2).unwrap();
        assert_eq!(unknown.response, "unknown account");

        assert_eq!(balance(&service, 1), Some(10));
        assert_eq!(balance(&service, 2), None);
    }

    #[test]
    fn test_client_errors_are_verdicts() {
        let service = service();

        let outcome = service
            .run_batch(vec![
                transfer_tx(1, 1, 2, -5),
                Transaction::new(2, AppId(99), "anything", 100),
                Transaction::new(3, TOKEN, "burn everything", 100),
            ])
            .unwrap();

        let verdicts: Vec<_> = outcome.results.iter().map(|r| r.verdict).collect();
        assert_eq!(
            verdicts,
            vec![
                Verdict::Completed(StatusCode::BAD_REQUEST),
                Verdict::Completed(StatusCode::NOT_FOUND),
                Verdict::Completed(StatusCode::BAD_REQUEST),
            ]
        );
        assert_eq!(outcome.result(2).unwrap().response, "unknown application 99");
    }

    #[test]
    fn test_panic_is_contained_to_its_transaction() {
        let service = service();
        seed_balance(service.storage(), 1, 10);

        let outcome = service
            .run_batch(vec![
                guard_tx(1, 1, "panic"),
                Transaction::new(2, GUARD, "panic", 100),
                transfer_tx(3, 1, 2, 4),
            ])
            .unwrap();

        assert_eq!(
            outcome.result(1).unwrap().response,
            "nested 400: missing account"
        );
        assert_eq!(
            outcome.result(2).unwrap().verdict,
            Verdict::Failed(FailureKind::ContractPanic)
        );
        assert!(outcome.result(3).unwrap().verdict.is_success());
        assert_eq!(balance(&service, 2), Some(4));
    }

    #[test]
    fn test_worker_fatal_aborts_batch() {
        let service = service_with_workers(2);
        seed_balance(service.storage(), 1, 10);

        // Vault request with an empty memory access list.
        let rogue = Transaction::new(2, VAULT, "deposit 7 1", 100);
        let result = service.run_batch(vec![transfer_tx(1, 1, 2, 1), rogue]);

        assert!(matches!(
            result,
            Err(RuntimeError::WorkerFatal { tx_id: 2, .. })
        ));
        let stats = service.stats();
        assert_eq!(stats.batches_aborted, 1);
        assert_eq!(stats.batches_executed, 0);
    }

    #[test]
    fn test_duplicate_ids_rejected_before_execution() {
        let service = service();
        seed_balance(service.storage(), 1, 10);

        let result = service.run_batch(vec![transfer_tx(1, 1, 2, 1), transfer_tx(1, 1, 3, 1)]);

        assert!(matches!(result, Err(RuntimeError::Scheduler(_))));
        assert_eq!(balance(&service, 1), Some(10));
    }

    #[test]
    fn test_stats_track_verdicts_across_batches() {
        let service = service();
        seed_balance(service.storage(), 1, 10);

        service
            .run_batch(vec![transfer_tx(1, 1, 2, 1), transfer_tx(2, 1, 2, 100)])
            .unwrap();
        service.run_batch(vec![vault_tx(3, 1, "unbalanced 1")]).unwrap();

        let stats = service.stats();
        assert_eq!(stats.batches_executed, 2);
        assert_eq!(stats.transactions_executed, 3);
        assert_eq!(stats.successful_executions, 1);
        assert_eq!(stats.failed_executions, 1);
    }

    // =========================================================================
    // ASYNC API
    // =========================================================================

    #[tokio::test]
    async fn test_execute_batch_through_api() {
        let service = service();
        seed_balance(service.storage(), 5, 40);
        let api: Arc<dyn ExecutionApi> = Arc::new(service.clone());

        let outcome = api
            .execute_batch(vec![transfer_tx(1, 5, 6, 15), mint_tx(2, 6, 5)])
            .await
            .unwrap();

        assert_eq!(outcome.succeeded(), 2);
        assert_eq!(balance(&service, 6), Some(20));

        let single = api
            .execute_transaction(Transaction::new(3, TOKEN, "balance 6", 100))
            .await
            .unwrap();
        assert_eq!(single.response, "20");
    }

    #[tokio::test]
    async fn test_concurrent_batches_on_cloned_services() {
        let service = service();
        let mut handles = Vec::new();
        for round in 0..4u64 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let account = 100 + round;
                service
                    .execute_batch(vec![mint_tx(round, account, 7)])
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().succeeded(), 1);
        }
        for account in 100..104 {
            assert_eq!(balance(&service, account), Some(7));
        }
    }
}
