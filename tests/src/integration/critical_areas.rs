//! # Critical Area Containment
//!
//! A fault inside a critical area, or an unbalanced area, is never contained
//! at an invocation boundary: it fails the whole transaction and nothing the
//! transaction did is committed. Faults outside areas are contained at the
//! invocation that raised them.

#[cfg(test)]
mod tests {
    use crate::contracts::*;
    use qc_11_contract_runtime::prelude::*;
    use std::sync::Arc;

    fn setup() -> (Arc<InMemoryHeap>, Executor<InMemoryHeap>) {
        let storage = Arc::new(InMemoryHeap::new());
        let executor = executor(Arc::clone(&storage));
        (storage, executor)
    }

    fn vault(storage: &InMemoryHeap, account: u64) -> (Option<i64>, Option<i64>) {
        (
            read_i64(storage, vault_chunk(account), 0),
            read_i64(storage, vault_chunk(account), 8),
        )
    }

    fn run(executor: &Executor<InMemoryHeap>, tx: &Transaction) -> TransactionResult {
        executor.execute(tx).unwrap()
    }

    // =========================================================================
    // BALANCED AREAS
    // =========================================================================

    #[test]
    fn test_lock_inside_area_commits() {
        let (storage, executor) = setup();
        run(&executor, &vault_tx(1, 1, "deposit 1 100"));

        let result = run(&executor, &vault_tx(2, 1, "lock 1 30"));

        assert_eq!(result.verdict, Verdict::Completed(StatusCode::OK));
        assert_eq!(result.response, "70");
        assert_eq!(vault(&storage, 1), (Some(30), Some(70)));
    }

    #[test]
    fn test_revert_after_closing_area_is_contained() {
        let (storage, executor) = setup();
        run(&executor, &vault_tx(1, 1, "deposit 1 10"));

        let result = run(&executor, &vault_tx(2, 1, "lock 1 30"));

        assert_eq!(result.verdict, Verdict::Completed(StatusCode::REVERTED));
        assert_eq!(result.response, "nothing to lock");
        assert_eq!(vault(&storage, 1), (Some(0), Some(10)));
    }

    // =========================================================================
    // FAULTS INSIDE AREAS
    // =========================================================================

    #[test]
    fn test_fault_inside_area_fails_transaction() {
        let (storage, executor) = setup();
        run(&executor, &vault_tx(1, 1, "deposit 1 10"));

        let result = run(&executor, &vault_tx(2, 1, "lock_unchecked 1 5"));

        assert_eq!(
            result.verdict,
            Verdict::Failed(FailureKind::FaultInCriticalArea)
        );
        assert_eq!(result.response, "fault inside critical area");
        assert_eq!(vault(&storage, 1), (Some(0), Some(10)));
    }

    #[test]
    fn test_fault_inside_nested_area_escapes_caller() {
        let (storage, executor) = setup();
        run(&executor, &vault_tx(1, 1, "deposit 1 10"));

        // The guard would report a contained failure; this one is not.
        let result = run(&executor, &guard_tx(2, 1, "lock_unchecked 1 5"));

        assert_eq!(
            result.verdict,
            Verdict::Failed(FailureKind::FaultInCriticalArea)
        );
        assert_eq!(vault(&storage, 1), (Some(0), Some(10)));
    }

    #[test]
    fn test_fault_outside_area_contained_at_callee() {
        let (storage, executor) = setup();
        run(&executor, &vault_tx(1, 1, "deposit 1 10"));

        let result = run(&executor, &guard_tx(2, 1, "divide 1 0"));

        assert_eq!(result.verdict, Verdict::Completed(StatusCode::OK));
        assert_eq!(result.response, "nested failed: arithmetic trap");
        assert_eq!(vault(&storage, 1), (Some(0), Some(10)));
    }

    #[test]
    fn test_nested_success_reported_by_caller() {
        let (storage, executor) = setup();
        run(&executor, &vault_tx(1, 1, "deposit 1 10"));

        let result = run(&executor, &guard_tx(2, 1, "divide 1 2"));

        assert_eq!(result.response, "nested 200: ");
        assert_eq!(vault(&storage, 1), (Some(0), Some(5)));
    }

    // =========================================================================
    // PROTOCOL VIOLATIONS
    // =========================================================================

    #[test]
    fn test_area_left_open_fails_transaction() {
        let (storage, executor) = setup();
        run(&executor, &vault_tx(1, 1, "deposit 1 10"));

        let result = run(&executor, &vault_tx(2, 1, "unbalanced 1"));

        assert_eq!(
            result.verdict,
            Verdict::Failed(FailureKind::ProtocolViolation)
        );
        assert_eq!(result.response, "critical area protocol violation");
        assert_eq!(vault(&storage, 1), (Some(0), Some(10)));
    }

    #[test]
    fn test_exit_without_enter_fails_transaction() {
        let (_, executor) = setup();

        let bare = run(&executor, &vault_tx(1, 1, "stray_exit"));
        let with_account = run(&executor, &vault_tx(2, 1, "stray_exit 1"));

        for result in [bare, with_account] {
            assert_eq!(
                result.verdict,
                Verdict::Failed(FailureKind::ProtocolViolation)
            );
        }
    }

    #[test]
    fn test_unbalanced_callee_escapes_caller() {
        let (_, executor) = setup();

        let result = run(&executor, &guard_tx(1, 1, "unbalanced 1"));

        assert_eq!(
            result.verdict,
            Verdict::Failed(FailureKind::ProtocolViolation)
        );
        assert_eq!(result.attempts, 1);
        assert!(result.failure_record.is_empty());
    }
}
