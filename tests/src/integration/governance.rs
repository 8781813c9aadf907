//! # Governance Flows
//!
//! Roles, multi-approval time-locks on application operations, and the
//! emergency stop, all driven through the runtime facade.

#[cfg(test)]
mod tests {
    use crate::fixtures::{
        amount, harness, vault_v2, Harness, BALANCE, DEPOSIT, LOTTERY, WITHDRAW,
    };
    use shared_types::{OperationId, Principal, RoleId, Tick};
    use ur_03_access_control::{AccessError, DenialReason, OperationPolicy, TimelockHandle};
    use ur_05_commit_reveal::seal;
    use ur_06_module_registry::ModuleId;
    use ur_runtime::{Runtime, RuntimeError};

    fn approvers(h: &Harness) -> [Principal; 2] {
        let approvers = [Principal::from_label("a1"), Principal::from_label("a2")];
        for approver in approvers {
            h.runtime
                .grant_role(h.owner, &RoleId::TIMELOCK_APPROVER, approver)
                .unwrap();
        }
        approvers
    }

    /// Makes `vault.withdraw` time-locked and proposes a withdraw of 5.
    fn locked_withdraw(h: &Harness) -> TimelockHandle {
        h.runtime
            .register_operation(h.owner, &WITHDRAW, OperationPolicy::public().timelocked())
            .unwrap();
        h.runtime
            .propose_timelocked(
                h.owner,
                &WITHDRAW,
                Tick(10),
                Some(Runtime::payload_hash(&amount(5))),
            )
            .unwrap()
    }

    #[test]
    fn test_timelocked_operation_lifecycle() {
        let h = harness();
        h.deposit(h.user, 10);
        let [a1, a2] = approvers(&h);
        let handle = locked_withdraw(&h);

        assert!(matches!(
            h.runtime.invoke(h.user, WITHDRAW, amount(5)),
            Err(RuntimeError::Access(AccessError::Unauthorized {
                reason: DenialReason::RequiresTimelock,
                ..
            }))
        ));

        h.runtime.approve_timelocked(handle, a1).unwrap();
        h.runtime.approve_timelocked(handle, a2).unwrap();
        assert!(matches!(
            h.runtime.invoke_timelocked(h.user, handle, WITHDRAW, amount(5)),
            Err(RuntimeError::Access(AccessError::TooEarly { .. }))
        ));

        h.clock.set(Tick(10));
        let out = h
            .runtime
            .invoke_timelocked(h.user, handle, WITHDRAW, amount(5))
            .unwrap();
        assert_eq!(out, amount(5));

        // Consumed.
        assert!(matches!(
            h.runtime.invoke_timelocked(h.user, handle, WITHDRAW, amount(5)),
            Err(RuntimeError::Access(AccessError::TimelockNotFound(_)))
        ));
    }

    #[test]
    fn test_timelock_bound_to_payload() {
        let h = harness();
        h.deposit(h.user, 10);
        let [a1, a2] = approvers(&h);
        let handle = locked_withdraw(&h);
        h.runtime.approve_timelocked(handle, a1).unwrap();
        h.runtime.approve_timelocked(handle, a2).unwrap();
        h.clock.set(Tick(10));

        assert!(matches!(
            h.runtime.invoke_timelocked(h.user, handle, WITHDRAW, amount(9)),
            Err(RuntimeError::Access(AccessError::TimelockMismatch(_)))
        ));
        assert!(matches!(
            h.runtime.invoke_timelocked(h.user, handle, DEPOSIT, amount(5)),
            Err(RuntimeError::Access(AccessError::TimelockMismatch(_)))
        ));
        assert!(h.runtime.timelock(handle).unwrap().is_some());
    }

    #[test]
    fn test_failed_timelocked_call_keeps_proposal() {
        let h = harness();
        // Total is zero, so the withdraw itself fails.
        let [a1, a2] = approvers(&h);
        let handle = locked_withdraw(&h);
        h.runtime.approve_timelocked(handle, a1).unwrap();
        h.runtime.approve_timelocked(handle, a2).unwrap();
        h.clock.set(Tick(10));

        assert!(matches!(
            h.runtime.invoke_timelocked(h.user, handle, WITHDRAW, amount(5)),
            Err(RuntimeError::Module(_))
        ));
        assert!(h.runtime.timelock(handle).unwrap().is_some());

        h.deposit(h.user, 5);
        h.runtime
            .invoke_timelocked(h.user, handle, WITHDRAW, amount(5))
            .unwrap();
    }

    #[test]
    fn test_timelock_expires_after_grace() {
        let h = harness();
        h.deposit(h.user, 10);
        let [a1, a2] = approvers(&h);
        let handle = locked_withdraw(&h);
        h.runtime.approve_timelocked(handle, a1).unwrap();
        h.runtime.approve_timelocked(handle, a2).unwrap();

        let grace = h.runtime.config().access.timelock_grace_period;
        h.clock.set(Tick(10 + grace + 1));
        assert!(matches!(
            h.runtime.invoke_timelocked(h.user, handle, WITHDRAW, amount(5)),
            Err(RuntimeError::Access(AccessError::Expired { .. }))
        ));
    }

    #[test]
    fn test_cancel_and_outsider_approval() {
        let h = harness();
        let handle = locked_withdraw(&h);
        let outsider = Principal::from_label("outsider");

        assert!(h
            .runtime
            .approve_timelocked(handle, outsider)
            .unwrap_err()
            .is_unauthorized());
        assert!(h
            .runtime
            .cancel_timelocked(handle, outsider)
            .unwrap_err()
            .is_unauthorized());

        h.runtime.cancel_timelocked(handle, h.owner).unwrap();
        assert_eq!(h.runtime.timelock(handle).unwrap(), None);
    }

    #[test]
    fn test_emergency_stop_by_pauser() {
        let h = harness();
        let pauser = Principal::from_label("pauser");
        h.deposit(h.user, 3);

        assert!(h.runtime.halt(pauser).unwrap_err().is_unauthorized());
        h.runtime
            .grant_role(h.owner, &RoleId::PAUSER, pauser)
            .unwrap();
        h.runtime.halt(pauser).unwrap();
        assert!(h.runtime.is_halted().unwrap());

        assert_eq!(
            h.runtime.invoke(h.user, DEPOSIT, amount(1)),
            Err(RuntimeError::Access(AccessError::Halted(DEPOSIT)))
        );

        h.runtime.resume(pauser).unwrap();
        assert_eq!(h.deposit(h.user, 1), 4);
    }

    #[test]
    fn test_read_operation_allowed_when_halted() {
        let h = harness();
        h.deposit(h.user, 2);
        h.runtime
            .register_operation(
                h.owner,
                &BALANCE,
                OperationPolicy::public().allowed_when_halted(),
            )
            .unwrap();
        h.runtime.halt(h.owner).unwrap();

        assert_eq!(
            h.runtime.invoke(h.user, BALANCE, Vec::new()).unwrap(),
            amount(2)
        );
        assert!(h.runtime.invoke(h.user, DEPOSIT, amount(1)).is_err());
    }

    #[test]
    fn test_oracle_and_upgrade_rejected_while_halted() {
        let h = harness();
        let late = Principal::from_label("late");
        h.runtime
            .commit(LOTTERY, h.user, seal(b"pick", b"salt"))
            .unwrap();
        h.runtime.halt(h.owner).unwrap();
        h.clock.set(Tick(1));

        let halted = |op: &str| -> Result<(), RuntimeError> {
            Err(RuntimeError::Access(AccessError::Halted(OperationId::new(op))))
        };
        assert_eq!(
            h.runtime.commit(LOTTERY, late, seal(b"x", b"y")).map(|_| ()),
            halted("lottery.commit")
        );
        assert_eq!(
            h.runtime.reveal(LOTTERY, h.user, b"pick", b"salt").map(|_| ()),
            halted("lottery.reveal")
        );
        h.clock.set(Tick(h.runtime.config().oracle.reveal_window));
        assert_eq!(
            h.runtime.forfeit(LOTTERY, h.user).map(|_| ()),
            halted("lottery.forfeit")
        );
        assert_eq!(
            h.runtime.activate_module(h.owner, vault_v2()).map(|_| ()),
            halted("module.upgrade")
        );

        assert_eq!(h.runtime.commit_record(LOTTERY, late).unwrap(), None);
        let record = h.runtime.commit_record(LOTTERY, h.user).unwrap().unwrap();
        assert!(!record.revealed && !record.forfeited);
        assert_eq!(
            h.runtime.current_module().unwrap().module_id,
            ModuleId::from("vault-v1")
        );

        h.runtime.resume(h.owner).unwrap();
        assert!(h.runtime.forfeit(LOTTERY, h.user).unwrap().forfeited);
    }

    #[test]
    fn test_upgrade_while_halted_when_policy_allows() {
        let h = harness();
        h.runtime
            .register_operation(
                h.owner,
                &OperationId::UPGRADE,
                OperationPolicy::role(RoleId::UPGRADER).allowed_when_halted(),
            )
            .unwrap();
        h.runtime.halt(h.owner).unwrap();

        let active = h.runtime.activate_module(h.owner, vault_v2()).unwrap();
        assert_eq!(active.module_id, ModuleId::from("vault-v2"));
        assert!(h.runtime.invoke(h.user, DEPOSIT, amount(1)).is_err());
    }

    #[test]
    fn test_ownership_transfer() {
        let h = harness();
        let next = Principal::from_label("next-owner");

        assert!(h
            .runtime
            .transfer_ownership(h.user, next)
            .unwrap_err()
            .is_unauthorized());
        h.runtime.transfer_ownership(h.owner, next).unwrap();
        assert_eq!(h.runtime.owner().unwrap(), Some(next));

        let restricted = OperationId::from_static("vault.sweep");
        assert!(h
            .runtime
            .register_operation(h.owner, &restricted, OperationPolicy::public())
            .unwrap_err()
            .is_unauthorized());
        h.runtime
            .register_operation(next, &restricted, OperationPolicy::public())
            .unwrap();
    }

    #[test]
    fn test_delegated_role_admin() {
        let h = harness();
        let treasurer = RoleId::from_static("treasurer");
        let treasury_admin = RoleId::from_static("treasury.admin");
        let lead = Principal::from_label("lead");
        let member = Principal::from_label("member");

        h.runtime
            .set_role_admin(h.owner, &treasurer, &treasury_admin)
            .unwrap();
        assert!(h
            .runtime
            .grant_role(lead, &treasurer, member)
            .unwrap_err()
            .is_unauthorized());

        h.runtime
            .grant_role(h.owner, &treasury_admin, lead)
            .unwrap();
        h.runtime.grant_role(lead, &treasurer, member).unwrap();
        assert!(h.runtime.has_role(&treasurer, member).unwrap());

        h.runtime.renounce_role(member, &treasurer).unwrap();
        assert!(!h.runtime.has_role(&treasurer, member).unwrap());
    }
}
