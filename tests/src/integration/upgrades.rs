//! # Module Upgrades
//!
//! v1 → v2 adds a field and keeps every existing slot; v2 → v3 retypes
//! `total` and must be refused with v2 still serving calls.

#[cfg(test)]
mod tests {
    use crate::fixtures::{amount, harness, vault_v1, vault_v2, vault_v3, DEPOSIT};
    use shared_types::{OperationId, Principal, RoleId, Tick, U256};
    use ur_01_storage_facade::{Namespace, SlotValue, TypeTag};
    use ur_03_access_control::{AccessError, OperationPolicy};
    use ur_06_module_registry::{ModuleDescriptor, ModuleId, RegistryError, SchemaIncompatibility};
    use ur_runtime::RuntimeError;

    #[test]
    fn test_additive_upgrade_preserves_state() {
        let h = harness();
        h.deposit(h.user, 7);

        let active = h.runtime.activate_module(h.owner, vault_v2()).unwrap();
        assert_eq!(active.module_id, ModuleId::from("vault-v2"));

        assert_eq!(h.deposit(h.user, 3), 10);
        let namespace = Namespace::new(h.runtime.config().app_namespace.clone());
        let depositor = h
            .runtime
            .query(|s| s.try_get_typed(&namespace, b"last_depositor"))
            .unwrap();
        assert_eq!(depositor, Some(SlotValue::Address(h.user)));
    }

    #[test]
    fn test_retyping_upgrade_rejected_and_v2_stays_active() {
        let h = harness();
        h.deposit(h.user, 7);
        h.runtime.activate_module(h.owner, vault_v2()).unwrap();

        let err = h.runtime.activate_module(h.owner, vault_v3()).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::Registry(RegistryError::IncompatibleSchema {
                module: ModuleId::from("vault-v3"),
                reason: SchemaIncompatibility::Retyped {
                    key: "total".into(),
                    from: TypeTag::UInt,
                    to: TypeTag::Int,
                },
            })
        );

        assert_eq!(
            h.runtime.current_module().unwrap().module_id,
            ModuleId::from("vault-v2")
        );
        assert_eq!(h.deposit(h.user, 1), 8);
        assert_eq!(h.total(), Some(SlotValue::UInt(U256::from(8))));
    }

    #[test]
    fn test_history_records_retirement() {
        let h = harness();
        h.clock.set(Tick(4));
        h.runtime.activate_module(h.owner, vault_v2()).unwrap();

        let history = h.runtime.module_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].module_id, ModuleId::from("vault-v1"));
        assert_eq!(history[0].retired_at, Some(Tick(4)));
        assert_eq!(history[1].activated_at, Some(Tick(4)));
        assert!(history[1].is_active());
    }

    #[test]
    fn test_removing_a_field_rejected() {
        let h = harness();
        h.runtime.activate_module(h.owner, vault_v2()).unwrap();

        // v1 layout lacks last_depositor.
        let shrunk = ModuleDescriptor::new(
            "vault-v1b",
            "code://vault-v1",
            vault_v1().schema.clone(),
        );
        assert!(matches!(
            h.runtime.activate_module(h.owner, shrunk),
            Err(RuntimeError::Registry(RegistryError::IncompatibleSchema {
                reason: SchemaIncompatibility::Removed { .. },
                ..
            }))
        ));
    }

    #[test]
    fn test_upgrader_role_can_activate() {
        let h = harness();
        let upgrader = Principal::from_label("upgrader");
        h.runtime
            .register_operation(
                h.owner,
                &OperationId::UPGRADE,
                OperationPolicy::role(RoleId::UPGRADER),
            )
            .unwrap();

        assert!(h
            .runtime
            .activate_module(upgrader, vault_v2())
            .unwrap_err()
            .is_unauthorized());
        h.runtime
            .grant_role(h.owner, &RoleId::UPGRADER, upgrader)
            .unwrap();
        h.runtime.activate_module(upgrader, vault_v2()).unwrap();
    }

    #[test]
    fn test_timelocked_upgrade() {
        let h = harness();
        let upgrader = Principal::from_label("upgrader");
        let approvers = [Principal::from_label("a1"), Principal::from_label("a2")];
        h.runtime
            .register_operation(
                h.owner,
                &OperationId::UPGRADE,
                OperationPolicy::role(RoleId::UPGRADER).timelocked(),
            )
            .unwrap();
        h.runtime
            .grant_role(h.owner, &RoleId::UPGRADER, upgrader)
            .unwrap();
        for approver in approvers {
            h.runtime
                .grant_role(h.owner, &RoleId::TIMELOCK_APPROVER, approver)
                .unwrap();
        }

        assert!(matches!(
            h.runtime.activate_module(upgrader, vault_v2()),
            Err(RuntimeError::Registry(RegistryError::Access(
                AccessError::Unauthorized { .. }
            )))
        ));

        let handle = h
            .runtime
            .propose_timelocked(
                upgrader,
                &OperationId::UPGRADE,
                Tick(10),
                Some(vault_v2().fingerprint()),
            )
            .unwrap();
        h.runtime.approve_timelocked(handle, approvers[0]).unwrap();

        h.clock.set(Tick(10));
        assert!(matches!(
            h.runtime
                .activate_module_timelocked(upgrader, handle, vault_v2()),
            Err(RuntimeError::Registry(RegistryError::Access(
                AccessError::ThresholdNotMet { .. }
            )))
        ));
        let status = h.runtime.approve_timelocked(handle, approvers[1]).unwrap();
        assert!(status.is_met());

        h.runtime
            .activate_module_timelocked(upgrader, handle, vault_v2())
            .unwrap();
        assert_eq!(
            h.runtime.current_module().unwrap().module_id,
            ModuleId::from("vault-v2")
        );
        assert_eq!(h.runtime.timelock(handle).unwrap(), None);
        h.runtime.invoke(h.user, DEPOSIT, amount(1)).unwrap();
    }
}
