//! Privilege escalation resistance.
//!
//! Principals start with nothing except what the owner hands out. Any mix of
//! grant, revoke, admin-change and ownership attempts by them must leave
//! every role assignment and the owner unchanged.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use shared_types::{ManualClock, Principal, RoleId, Tick};
    use std::sync::Arc;
    use ur_01_storage_facade::StorageFacade;
    use ur_03_access_control::{AccessConfig, AccessController};

    const ROLES: [RoleId; 5] = [
        RoleId::ADMIN,
        RoleId::UPGRADER,
        RoleId::PAUSER,
        RoleId::TIMELOCK_APPROVER,
        RoleId::from_static("treasurer"),
    ];

    #[derive(Debug, Clone)]
    enum Attempt {
        Grant { actor: usize, role: usize, target: usize },
        Revoke { actor: usize, role: usize, target: usize },
        SetAdmin { actor: usize, role: usize, admin: usize },
        TakeOwnership { actor: usize },
    }

    fn arb_attempt() -> impl Strategy<Value = Attempt> {
        let idx = || 0usize..4;
        let role = || 0usize..ROLES.len();
        prop_oneof![
            (idx(), role(), idx()).prop_map(|(actor, role, target)| Attempt::Grant { actor, role, target }),
            (idx(), role(), idx()).prop_map(|(actor, role, target)| Attempt::Revoke { actor, role, target }),
            (idx(), role(), role()).prop_map(|(actor, role, admin)| Attempt::SetAdmin { actor, role, admin }),
            idx().prop_map(|actor| Attempt::TakeOwnership { actor }),
        ]
    }

    fn principals() -> [Principal; 4] {
        [
            Principal::from_label("p0"),
            Principal::from_label("p1"),
            Principal::from_label("p2"),
            Principal::from_label("p3"),
        ]
    }

    fn assignments(access: &AccessController, storage: &StorageFacade) -> Vec<bool> {
        let mut held = Vec::new();
        for role in &ROLES {
            for p in principals() {
                held.push(access.has_role(storage, role, p).unwrap());
            }
        }
        held
    }

    proptest! {
        /// Only `p0` holds a role (`upgrader`, which administers nothing),
        /// so no attempt by any principal may succeed.
        #[test]
        fn test_no_escalation_without_admin(attempts in prop::collection::vec(arb_attempt(), 1..32)) {
            let clock = Arc::new(ManualClock::new(Tick(0)));
            let access = AccessController::new(AccessConfig::default(), clock);
            let mut storage = StorageFacade::in_memory();
            let owner = Principal::from_label("owner");
            let people = principals();
            access.initialize(&mut storage, owner).unwrap();
            access
                .grant_role(&mut storage, owner, &RoleId::UPGRADER, people[0])
                .unwrap();
            let before = assignments(&access, &storage);

            for attempt in attempts {
                let result = match attempt {
                    Attempt::Grant { actor, role, target } => {
                        access.grant_role(&mut storage, people[actor], &ROLES[role], people[target])
                    }
                    Attempt::Revoke { actor, role, target } => {
                        access.revoke_role(&mut storage, people[actor], &ROLES[role], people[target])
                    }
                    Attempt::SetAdmin { actor, role, admin } => {
                        access.set_role_admin(&mut storage, people[actor], &ROLES[role], &ROLES[admin])
                    }
                    Attempt::TakeOwnership { actor } => {
                        access.transfer_ownership(&mut storage, people[actor], people[actor])
                    }
                };
                let denied = result.as_ref().err().is_some_and(|e| e.is_unauthorized());
                prop_assert!(denied, "attempt succeeded: {:?}", result);
            }

            prop_assert_eq!(assignments(&access, &storage), before);
            prop_assert_eq!(access.owner(&storage).unwrap(), Some(owner));
        }

        /// Renouncing only ever removes the caller's own membership.
        #[test]
        fn test_renounce_is_self_only(actor in 0usize..4, role in 0usize..ROLES.len()) {
            let clock = Arc::new(ManualClock::new(Tick(0)));
            let access = AccessController::new(AccessConfig::default(), clock);
            let mut storage = StorageFacade::in_memory();
            let owner = Principal::from_label("owner");
            let people = principals();
            access.initialize(&mut storage, owner).unwrap();
            for p in people {
                access.grant_role(&mut storage, owner, &ROLES[role], p).unwrap();
            }

            access.renounce_role(&mut storage, people[actor], &ROLES[role]).unwrap();
            for (i, p) in people.iter().enumerate() {
                prop_assert_eq!(access.has_role(&storage, &ROLES[role], *p).unwrap(), i != actor);
            }
        }
    }
}
