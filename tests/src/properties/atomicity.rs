//! All-or-nothing behavior of transactions and guarded calls.

use ur_01_storage_facade::{Namespace, StorageFacade};

/// Every live `(key, encoded value)` pair in `namespace`.
pub fn snapshot(storage: &StorageFacade, namespace: &Namespace) -> Vec<(Vec<u8>, Vec<u8>)> {
    storage
        .keys(namespace)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|key| {
            let value = storage.get(namespace, &key).ok()?;
            Some((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shared_types::{OperationId, U256};
    use std::sync::Arc;
    use ur_01_storage_facade::{SlotValue, StorageError};
    use ur_02_dispatch_guard::{DispatchGuard, GuardError};
    use ur_runtime::MemorySink;

    fn arb_writes() -> impl Strategy<Value = Vec<(u8, u64)>> {
        prop::collection::vec((0u8..8, any::<u64>()), 0..24)
    }

    fn apply(storage: &mut StorageFacade, ns: &Namespace, writes: &[(u8, u64)]) -> Result<(), StorageError> {
        for (key, value) in writes {
            storage.set_typed(ns, &[*key], &SlotValue::UInt(U256::from(*value)))?;
        }
        Ok(())
    }

    proptest! {
        /// A transaction that fails after any number of writes leaves the
        /// store and the sink exactly as they were.
        #[test]
        fn test_failed_transaction_rolls_back(
            committed in arb_writes(),
            attempted in arb_writes(),
        ) {
            let sink = Arc::new(MemorySink::new());
            let mut storage = StorageFacade::in_memory_with_sink(sink.clone());
            let ns = Namespace::new("app");
            apply(&mut storage, &ns, &committed).unwrap();
            let before = snapshot(&storage, &ns);
            sink.clear();

            let result: Result<(), StorageError> = storage.atomically(|s| {
                apply(s, &ns, &attempted)?;
                Err(StorageError::Backend("abort".into()))
            });

            prop_assert!(result.is_err());
            prop_assert_eq!(snapshot(&storage, &ns), before);
            prop_assert!(sink.is_empty());
            prop_assert!(!storage.in_transaction());
        }

        /// An inner failure discards only the inner writes.
        #[test]
        fn test_nested_failure_keeps_outer_writes(
            outer in arb_writes(),
            inner in arb_writes(),
        ) {
            let mut storage = StorageFacade::in_memory();
            let ns = Namespace::new("app");

            let mut expected = StorageFacade::in_memory();
            apply(&mut expected, &ns, &outer).unwrap();

            storage
                .atomically(|s| -> Result<(), StorageError> {
                    apply(s, &ns, &outer)?;
                    let inner_result: Result<(), StorageError> = s.atomically(|s| {
                        apply(s, &ns, &inner)?;
                        Err(StorageError::Backend("abort".into()))
                    });
                    assert!(inner_result.is_err());
                    Ok(())
                })
                .unwrap();

            prop_assert_eq!(snapshot(&storage, &ns), snapshot(&expected, &ns));
        }

        /// The in-progress marker is cleared after every guarded call,
        /// whether it succeeds or fails.
        #[test]
        fn test_guard_marker_always_cleared(outcomes in prop::collection::vec(any::<bool>(), 1..16)) {
            let guard = DispatchGuard::new();
            let mut storage = StorageFacade::in_memory();
            let op = OperationId::from_static("vault.withdraw");
            let ns = Namespace::new("app");

            for (round, succeed) in outcomes.iter().enumerate() {
                let result = guard.guarded_call(&mut storage, &op, |s| -> Result<(), GuardError> {
                    s.set_typed(&ns, b"round", &SlotValue::UInt(U256::from(round)))?;
                    if *succeed {
                        Ok(())
                    } else {
                        Err(GuardError::Storage(StorageError::Backend("module failed".into())))
                    }
                });
                prop_assert_eq!(result.is_ok(), *succeed);
                prop_assert!(!guard.is_in_progress(&storage, &op).unwrap());
            }

            let last_success = outcomes.iter().rposition(|ok| *ok);
            let stored = storage.try_get_typed(&ns, b"round").unwrap();
            prop_assert_eq!(stored, last_success.map(|r| SlotValue::UInt(U256::from(r))));
        }
    }
}
