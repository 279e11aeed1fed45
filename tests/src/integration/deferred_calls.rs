//! # Deferred Calls
//!
//! Calls queued with `invoke_deferred` run after the queuing invocation has
//! returned, in queue order, and are dropped when it reverts or fails.

#[cfg(test)]
mod tests {
    use crate::contracts::*;
    use qc_11_contract_runtime::prelude::*;
    use std::sync::Arc;

    fn ledger(storage: &InMemoryHeap) -> (Option<i64>, Option<i64>) {
        (
            read_i64(storage, ledger_chunk(), 0),
            read_i64(storage, ledger_chunk(), 8),
        )
    }

    #[test]
    fn test_transfer_records_in_ledger() {
        let service = create_test_service(registry()).unwrap();
        seed_balance(service.storage(), 1, 100);

        let outcome = service
            .run_batch(vec![
                transfer_tx(1, 1, 2, 10),
                transfer_tx(2, 2, 3, 4),
                transfer_tx(3, 1, 3, 25),
            ])
            .unwrap();

        assert_eq!(outcome.succeeded(), 3);
        // Deferred results never replace the root response.
        assert!(outcome.results.iter().all(|r| r.response == "ok"));
        assert_eq!(ledger(service.storage()), (Some(3), Some(39)));
    }

    #[test]
    fn test_reverted_transfer_drops_deferred_call() {
        let service = create_test_service(registry()).unwrap();
        seed_balance(service.storage(), 1, 5);

        service
            .run_batch(vec![transfer_tx(1, 1, 2, 5), transfer_tx(2, 1, 2, 1)])
            .unwrap();

        assert_eq!(ledger(service.storage()), (Some(1), Some(5)));
    }

    #[test]
    fn test_ledger_visible_to_later_transaction() {
        let storage = Arc::new(InMemoryHeap::new());
        let executor = executor(Arc::clone(&storage));
        seed_balance(&storage, 1, 50);

        executor.execute(&transfer_tx(1, 1, 2, 20)).unwrap();
        let count = Transaction::new(2, LEDGER, "count", 100)
            .with_memory([MemoryRegion::new(LEDGER, GLOBAL)]);
        let result = executor.execute(&count).unwrap();

        assert_eq!(result.response, "1");
    }

    #[test]
    fn test_self_deferring_chain_runs_at_root_level() {
        let storage = Arc::new(InMemoryHeap::new());
        let executor = executor(Arc::clone(&storage));

        let result = executor.execute(&notify_tx(1, 5)).unwrap();

        assert_eq!(result.verdict, Verdict::Completed(StatusCode::OK));
        assert_eq!(result.response, "1");
        assert_eq!(read_i64(&storage, notify_chunk(), 0), Some(6));
    }

    #[test]
    fn test_deferred_chain_not_bounded_by_call_depth() {
        let storage = Arc::new(InMemoryHeap::new());
        let config = RuntimeConfig {
            max_call_depth: 2,
            ..Default::default()
        };
        let executor = Executor::new(Arc::new(registry()), Arc::clone(&storage), config);

        executor.execute(&notify_tx(1, 10)).unwrap();

        assert_eq!(read_i64(&storage, notify_chunk(), 0), Some(11));
    }
}
