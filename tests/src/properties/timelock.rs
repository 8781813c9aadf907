//! Time-lock soundness: a proposal executes if and only if it is due, not
//! expired and approved by enough distinct approvers.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use shared_types::{ManualClock, OperationId, Principal, RoleId, Tick};
    use std::sync::Arc;
    use ur_01_storage_facade::StorageFacade;
    use ur_03_access_control::{AccessConfig, AccessController, AccessError, OperationPolicy};

    const SWEEP: OperationId = OperationId::from_static("vault.sweep");

    proptest! {
        #[test]
        fn test_execution_window_and_threshold(
            approvals in 0usize..4,
            extra_delay in 0u64..20,
            execute_at in 0u64..160,
        ) {
            let config = AccessConfig::default();
            let clock = Arc::new(ManualClock::new(Tick(0)));
            let access = AccessController::new(config.clone(), clock.clone());
            let mut storage = StorageFacade::in_memory();
            let owner = Principal::from_label("owner");
            let approvers: Vec<Principal> = (0..3)
                .map(|i| Principal::from_label(&format!("approver-{i}")))
                .collect();

            access.initialize(&mut storage, owner).unwrap();
            access
                .register_operation(&mut storage, owner, &SWEEP, OperationPolicy::public().timelocked())
                .unwrap();
            for approver in &approvers {
                access
                    .grant_role(&mut storage, owner, &RoleId::TIMELOCK_APPROVER, *approver)
                    .unwrap();
            }

            let earliest = config.min_timelock_delay + extra_delay;
            let handle = access
                .propose_timelocked(&mut storage, owner, &SWEEP, Tick(earliest), None)
                .unwrap();
            for approver in approvers.iter().take(approvals) {
                access.approve_timelocked(&mut storage, handle, *approver).unwrap();
            }

            clock.set(Tick(execute_at));
            let result = access.execute_timelocked_for(&mut storage, handle, owner, &SWEEP, None);

            let due = execute_at >= earliest;
            let live = execute_at <= earliest + config.timelock_grace_period;
            let approved = approvals.min(approvers.len()) >= config.approval_threshold;
            match result {
                Ok(_) => {
                    prop_assert!(due && live && approved);
                    prop_assert!(access.timelock(&storage, handle).unwrap().is_none());
                }
                Err(AccessError::TooEarly { .. }) => prop_assert!(!due),
                Err(AccessError::Expired { .. }) => prop_assert!(due && !live),
                Err(AccessError::ThresholdNotMet { .. }) => prop_assert!(due && live && !approved),
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }

        /// Repeated approvals from one approver count once.
        #[test]
        fn test_duplicate_approvals_count_once(repeats in 1usize..6) {
            let clock = Arc::new(ManualClock::new(Tick(0)));
            let access = AccessController::new(AccessConfig::default(), clock);
            let mut storage = StorageFacade::in_memory();
            let owner = Principal::from_label("owner");
            access.initialize(&mut storage, owner).unwrap();
            access
                .register_operation(&mut storage, owner, &SWEEP, OperationPolicy::public().timelocked())
                .unwrap();
            let handle = access
                .propose_timelocked(&mut storage, owner, &SWEEP, Tick(10), None)
                .unwrap();

            let mut status = None;
            for _ in 0..repeats {
                status = Some(access.approve_timelocked(&mut storage, handle, owner).unwrap());
            }
            prop_assert_eq!(status.map(|s| s.approvals), Some(1));
        }
    }
}
