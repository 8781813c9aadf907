//! # Access Controller
//!
//! Owner, roles, per-operation policies, and time-locked proposals. All
//! state lives in the `__access` namespace of the storage facade; the
//! controller itself only holds configuration and the clock.
//!
//! ## Authorization order
//!
//! 1. The owner passes every check.
//! 2. The operation must be registered, and its required role held.
//! 3. Time-locked operations are only reachable through
//!    [`AccessController::execute_timelocked`].

use crate::config::AccessConfig;
use crate::domain::layout;
use crate::domain::policy::{operations, OperationPolicy};
use crate::domain::timelock::{ApprovalStatus, TimeLock, TimelockHandle};
use crate::errors::{AccessError, DenialReason};
use shared_types::{
    ChangeNotification, Clock, Component, Hash, OperationId, Principal, RoleId, Tick, U256,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use ur_01_storage_facade::{Namespace, SlotValue, StorageFacade};

/// Logic layer over the `__access` namespace.
pub struct AccessController {
    config: AccessConfig,
    clock: Arc<dyn Clock>,
    namespace: Namespace,
}

impl std::fmt::Debug for AccessController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessController")
            .field("config", &self.config)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

fn deny(principal: Principal, operation: &OperationId, reason: DenialReason) -> AccessError {
    warn!(%principal, %operation, %reason, "Authorization denied");
    AccessError::Unauthorized {
        principal,
        operation: operation.clone(),
        reason,
    }
}

fn notify<const N: usize>(
    storage: &mut StorageFacade,
    event_kind: &'static str,
    fields: [(&'static str, String); N],
) {
    storage.publish(ChangeNotification::fields(
        Component::AccessControl,
        event_kind,
        fields,
    ));
}

impl AccessController {
    /// Creates a controller.
    #[must_use]
    pub fn new(config: AccessConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            namespace: Namespace::reserved("access"),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Namespace holding access state.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Current tick from the injected clock.
    #[must_use]
    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    // =========================================================================
    // OWNERSHIP
    // =========================================================================

    /// Sets the initial owner and installs the built-in operation policies.
    ///
    /// Built-ins: `module.upgrade` requires `upgrader`; `emergency.halt`
    /// and `emergency.resume` require `pauser` and stay available while
    /// halted.
    ///
    /// # Errors
    ///
    /// `AlreadyInitialized`, storage failures.
    pub fn initialize(&self, storage: &mut StorageFacade, owner: Principal) -> Result<(), AccessError> {
        if self.owner(storage)?.is_some() {
            return Err(AccessError::AlreadyInitialized);
        }
        storage.atomically(|s| -> Result<(), AccessError> {
            s.set_typed(&self.namespace, layout::OWNER, &SlotValue::Address(owner))?;
            let builtins = [
                (OperationId::UPGRADE, OperationPolicy::role(RoleId::UPGRADER)),
                (
                    OperationId::EMERGENCY_HALT,
                    OperationPolicy::role(RoleId::PAUSER).allowed_when_halted(),
                ),
                (
                    OperationId::EMERGENCY_RESUME,
                    OperationPolicy::role(RoleId::PAUSER).allowed_when_halted(),
                ),
            ];
            for (operation, policy) in &builtins {
                s.put_record(&self.namespace, &layout::policy(operation), policy)?;
            }
            notify(s, "owner_initialized", [("owner", format!("{owner:?}"))]);
            Ok(())
        })?;
        info!(%owner, "Access controller initialized");
        Ok(())
    }

    /// Current owner, if initialized.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn owner(&self, storage: &StorageFacade) -> Result<Option<Principal>, AccessError> {
        Ok(storage
            .try_get_typed(&self.namespace, layout::OWNER)?
            .and_then(|value| value.as_address()))
    }

    /// Returns true if `principal` is the owner.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn is_owner(&self, storage: &StorageFacade, principal: Principal) -> Result<bool, AccessError> {
        Ok(self.owner(storage)? == Some(principal))
    }

    /// Hands ownership to `new_owner`. Owner only.
    ///
    /// # Errors
    ///
    /// `NotInitialized`, `Unauthorized`, storage failures.
    pub fn transfer_ownership(
        &self,
        storage: &mut StorageFacade,
        caller: Principal,
        new_owner: Principal,
    ) -> Result<(), AccessError> {
        self.require_owner(storage, caller, &operations::TRANSFER_OWNERSHIP)?;
        storage.set_typed(&self.namespace, layout::OWNER, &SlotValue::Address(new_owner))?;
        notify(
            storage,
            "ownership_transferred",
            [
                ("from", format!("{caller:?}")),
                ("to", format!("{new_owner:?}")),
            ],
        );
        info!(from = %caller, to = %new_owner, "Ownership transferred");
        Ok(())
    }

    fn require_owner(
        &self,
        storage: &StorageFacade,
        caller: Principal,
        operation: &OperationId,
    ) -> Result<(), AccessError> {
        match self.owner(storage)? {
            None => Err(AccessError::NotInitialized),
            Some(owner) if owner == caller => Ok(()),
            Some(_) => Err(deny(caller, operation, DenialReason::NotOwner)),
        }
    }

    // =========================================================================
    // ROLES
    // =========================================================================

    /// Returns true if `principal` is a member of `role`.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn has_role(
        &self,
        storage: &StorageFacade,
        role: &RoleId,
        principal: Principal,
    ) -> Result<bool, AccessError> {
        Ok(storage.contains(&self.namespace, &layout::member(role, &principal))?)
    }

    /// Members of `role`.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn members(
        &self,
        storage: &StorageFacade,
        role: &RoleId,
    ) -> Result<BTreeSet<Principal>, AccessError> {
        Ok(storage
            .keys(&self.namespace)?
            .iter()
            .filter_map(|key| layout::parse_member(role, key))
            .collect())
    }

    /// Admin role of `role` (`admin` unless set otherwise).
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn role_admin(&self, storage: &StorageFacade, role: &RoleId) -> Result<RoleId, AccessError> {
        match storage.try_get_typed(&self.namespace, &layout::role_admin(role))? {
            Some(SlotValue::String(name)) => Ok(RoleId::new(name)),
            _ => Ok(RoleId::ADMIN),
        }
    }

    /// Changes the admin role of `role`. Owner only.
    ///
    /// # Errors
    ///
    /// `NotInitialized`, `Unauthorized`, storage failures.
    pub fn set_role_admin(
        &self,
        storage: &mut StorageFacade,
        caller: Principal,
        role: &RoleId,
        admin: &RoleId,
    ) -> Result<(), AccessError> {
        self.require_owner(storage, caller, &operations::SET_ROLE_ADMIN)?;
        storage.set_typed(
            &self.namespace,
            &layout::role_admin(role),
            &SlotValue::String(admin.as_str().to_string()),
        )?;
        notify(
            storage,
            "role_admin_changed",
            [("role", role.to_string()), ("admin", admin.to_string())],
        );
        info!(%role, %admin, "Role admin changed");
        Ok(())
    }

    fn require_role_admin(
        &self,
        storage: &StorageFacade,
        caller: Principal,
        role: &RoleId,
        operation: &OperationId,
    ) -> Result<(), AccessError> {
        if self.is_owner(storage, caller)? {
            return Ok(());
        }
        let admin = self.role_admin(storage, role)?;
        if self.has_role(storage, &admin, caller)? {
            return Ok(());
        }
        Err(deny(caller, operation, DenialReason::NotRoleAdmin(admin)))
    }

    /// Adds `principal` to `role`. Idempotent.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `caller` is the owner or holds the role's admin
    /// role; storage failures.
    pub fn grant_role(
        &self,
        storage: &mut StorageFacade,
        caller: Principal,
        role: &RoleId,
        principal: Principal,
    ) -> Result<(), AccessError> {
        self.require_role_admin(storage, caller, role, &operations::GRANT_ROLE)?;
        if self.has_role(storage, role, principal)? {
            debug!(%role, %principal, "Role already held");
            return Ok(());
        }
        storage.set_typed(
            &self.namespace,
            &layout::member(role, &principal),
            &SlotValue::Bool(true),
        )?;
        notify(
            storage,
            "role_granted",
            [
                ("role", role.to_string()),
                ("principal", format!("{principal:?}")),
                ("by", format!("{caller:?}")),
            ],
        );
        info!(%role, %principal, by = %caller, "Role granted");
        Ok(())
    }

    /// Removes `principal` from `role`. Idempotent.
    ///
    /// # Errors
    ///
    /// Same as [`AccessController::grant_role`].
    pub fn revoke_role(
        &self,
        storage: &mut StorageFacade,
        caller: Principal,
        role: &RoleId,
        principal: Principal,
    ) -> Result<(), AccessError> {
        self.require_role_admin(storage, caller, role, &operations::REVOKE_ROLE)?;
        self.remove_member(storage, role, principal, caller)
    }

    /// Drops the caller's own membership of `role`.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn renounce_role(
        &self,
        storage: &mut StorageFacade,
        caller: Principal,
        role: &RoleId,
    ) -> Result<(), AccessError> {
        self.remove_member(storage, role, caller, caller)
    }

    fn remove_member(
        &self,
        storage: &mut StorageFacade,
        role: &RoleId,
        principal: Principal,
        caller: Principal,
    ) -> Result<(), AccessError> {
        if !self.has_role(storage, role, principal)? {
            return Ok(());
        }
        storage.delete(&self.namespace, &layout::member(role, &principal))?;
        notify(
            storage,
            "role_revoked",
            [
                ("role", role.to_string()),
                ("principal", format!("{principal:?}")),
                ("by", format!("{caller:?}")),
            ],
        );
        info!(%role, %principal, by = %caller, "Role revoked");
        Ok(())
    }

    // =========================================================================
    // OPERATION POLICIES
    // =========================================================================

    /// Registers or replaces the policy of `operation`.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `caller` is the owner or an `admin` member;
    /// storage failures.
    pub fn register_operation(
        &self,
        storage: &mut StorageFacade,
        caller: Principal,
        operation: &OperationId,
        policy: OperationPolicy,
    ) -> Result<(), AccessError> {
        if !self.is_owner(storage, caller)? && !self.has_role(storage, &RoleId::ADMIN, caller)? {
            return Err(deny(
                caller,
                &operations::REGISTER_OPERATION,
                DenialReason::MissingRole(RoleId::ADMIN),
            ));
        }
        storage.put_record(&self.namespace, &layout::policy(operation), &policy)?;
        notify(
            storage,
            "operation_registered",
            [
                ("operation", operation.to_string()),
                (
                    "required_role",
                    policy
                        .required_role
                        .as_ref()
                        .map_or_else(|| "-".to_string(), RoleId::to_string),
                ),
                ("timelocked", policy.timelocked.to_string()),
            ],
        );
        info!(%operation, timelocked = policy.timelocked, "Operation registered");
        Ok(())
    }

    /// Policy of `operation`, if registered.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn operation_policy(
        &self,
        storage: &StorageFacade,
        operation: &OperationId,
    ) -> Result<Option<OperationPolicy>, AccessError> {
        Ok(storage.get_record(&self.namespace, &layout::policy(operation))?)
    }

    // =========================================================================
    // AUTHORIZATION
    // =========================================================================

    /// Checks whether `principal` may perform `operation` directly.
    ///
    /// # Errors
    ///
    /// `Unauthorized` with the failed rule; storage failures.
    pub fn authorize(
        &self,
        storage: &StorageFacade,
        principal: Principal,
        operation: &OperationId,
    ) -> Result<(), AccessError> {
        match self.role_rules(storage, principal, operation)? {
            Some(policy) if policy.timelocked => {
                Err(deny(principal, operation, DenialReason::RequiresTimelock))
            }
            _ => {
                debug!(%principal, %operation, "Authorized");
                Ok(())
            }
        }
    }

    /// Owner and role rules. Returns `None` for the owner, otherwise the
    /// operation's policy.
    fn role_rules(
        &self,
        storage: &StorageFacade,
        principal: Principal,
        operation: &OperationId,
    ) -> Result<Option<OperationPolicy>, AccessError> {
        if self.is_owner(storage, principal)? {
            return Ok(None);
        }
        let Some(policy) = self.operation_policy(storage, operation)? else {
            return Err(deny(principal, operation, DenialReason::UnregisteredOperation));
        };
        if let Some(role) = &policy.required_role {
            if !self.has_role(storage, role, principal)? {
                return Err(deny(
                    principal,
                    operation,
                    DenialReason::MissingRole(role.clone()),
                ));
            }
        }
        Ok(Some(policy))
    }

    // =========================================================================
    // TIME-LOCKS
    // =========================================================================

    /// Proposes a time-locked execution of `operation`.
    ///
    /// # Errors
    ///
    /// `NotTimelocked`, `Unauthorized` (proposer fails the owner/role
    /// rules), `DelayTooShort`, storage failures.
    pub fn propose_timelocked(
        &self,
        storage: &mut StorageFacade,
        proposer: Principal,
        operation: &OperationId,
        earliest_execute_at: Tick,
        payload_hash: Option<Hash>,
    ) -> Result<TimelockHandle, AccessError> {
        match self.operation_policy(storage, operation)? {
            Some(policy) if policy.timelocked => {}
            _ => return Err(AccessError::NotTimelocked(operation.clone())),
        }
        self.role_rules(storage, proposer, operation)?;

        let now = self.now();
        let minimum = now.plus(self.config.min_timelock_delay);
        if earliest_execute_at < minimum {
            return Err(AccessError::DelayTooShort {
                requested: earliest_execute_at,
                minimum,
            });
        }

        storage.atomically(|s| -> Result<TimelockHandle, AccessError> {
            let seq = s
                .try_get_typed(&self.namespace, layout::TIMELOCK_SEQ)?
                .and_then(|v| v.as_uint())
                .unwrap_or_default();
            let next = seq.saturating_add(U256::one());
            s.set_typed(&self.namespace, layout::TIMELOCK_SEQ, &SlotValue::UInt(next))?;
            let handle = TimelockHandle(next.low_u64());
            let lock = TimeLock {
                handle,
                target_operation: operation.clone(),
                payload_hash,
                earliest_execute_at,
                proposer,
                approvals: BTreeSet::new(),
                proposed_at: now,
            };
            s.put_record(&self.namespace, &layout::timelock(handle), &lock)?;
            notify(
                s,
                "timelock_proposed",
                [
                    ("handle", handle.to_string()),
                    ("operation", operation.to_string()),
                    ("earliest_execute_at", earliest_execute_at.to_string()),
                ],
            );
            info!(%handle, %operation, %earliest_execute_at, %proposer, "Time-lock proposed");
            Ok(handle)
        })
    }

    /// Pending proposal, if any.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn timelock(
        &self,
        storage: &StorageFacade,
        handle: TimelockHandle,
    ) -> Result<Option<TimeLock>, AccessError> {
        Ok(storage.get_record(&self.namespace, &layout::timelock(handle))?)
    }

    fn load_timelock(
        &self,
        storage: &StorageFacade,
        handle: TimelockHandle,
    ) -> Result<TimeLock, AccessError> {
        self.timelock(storage, handle)?
            .ok_or(AccessError::TimelockNotFound(handle))
    }

    /// Records an approval. Approving twice counts once.
    ///
    /// # Errors
    ///
    /// `TimelockNotFound`, `Unauthorized` (not the owner and not in the
    /// approver role), `Expired`, storage failures.
    pub fn approve_timelocked(
        &self,
        storage: &mut StorageFacade,
        handle: TimelockHandle,
        approver: Principal,
    ) -> Result<ApprovalStatus, AccessError> {
        let mut lock = self.load_timelock(storage, handle)?;
        if !self.is_owner(storage, approver)?
            && !self.has_role(storage, &self.config.approver_role, approver)?
        {
            return Err(deny(
                approver,
                &lock.target_operation,
                DenialReason::NotApprover,
            ));
        }
        let now = self.now();
        if lock.is_expired(now, self.config.timelock_grace_period) {
            return Err(AccessError::Expired {
                now,
                deadline: lock.deadline(self.config.timelock_grace_period),
            });
        }

        if lock.approvals.insert(approver) {
            storage.put_record(&self.namespace, &layout::timelock(handle), &lock)?;
            notify(
                storage,
                "timelock_approved",
                [
                    ("handle", handle.to_string()),
                    ("approver", format!("{approver:?}")),
                ],
            );
        }
        let status = ApprovalStatus {
            approvals: lock.approvals.len(),
            threshold: self.config.approval_threshold,
        };
        info!(%handle, %approver, approvals = status.approvals, threshold = status.threshold, "Time-lock approved");
        Ok(status)
    }

    /// Consumes an approved proposal, authorizing one execution of its
    /// target operation.
    ///
    /// Checks, in order: the proposal exists, the executor passes the
    /// owner/role rules for the target, `now >= earliest`, `now <= earliest
    /// + grace`, approvals reach the threshold.
    ///
    /// # Errors
    ///
    /// `TimelockNotFound`, `Unauthorized`, `TooEarly`, `Expired`,
    /// `ThresholdNotMet`, storage failures.
    pub fn execute_timelocked(
        &self,
        storage: &mut StorageFacade,
        handle: TimelockHandle,
        executor: Principal,
    ) -> Result<TimeLock, AccessError> {
        let lock = self.load_timelock(storage, handle)?;
        self.consume(storage, lock, executor)
    }

    /// Like [`AccessController::execute_timelocked`], but first checks that
    /// the proposal targets `operation` and carries `payload_hash`.
    ///
    /// # Errors
    ///
    /// `TimelockMismatch`, plus everything `execute_timelocked` returns.
    pub fn execute_timelocked_for(
        &self,
        storage: &mut StorageFacade,
        handle: TimelockHandle,
        executor: Principal,
        operation: &OperationId,
        payload_hash: Option<Hash>,
    ) -> Result<TimeLock, AccessError> {
        let lock = self.load_timelock(storage, handle)?;
        if &lock.target_operation != operation || lock.payload_hash != payload_hash {
            warn!(%handle, %operation, "Time-lock does not match request");
            return Err(AccessError::TimelockMismatch(handle));
        }
        self.consume(storage, lock, executor)
    }

    fn consume(
        &self,
        storage: &mut StorageFacade,
        lock: TimeLock,
        executor: Principal,
    ) -> Result<TimeLock, AccessError> {
        self.role_rules(storage, executor, &lock.target_operation)?;

        let now = self.now();
        if now < lock.earliest_execute_at {
            return Err(AccessError::TooEarly {
                now,
                earliest: lock.earliest_execute_at,
            });
        }
        let grace = self.config.timelock_grace_period;
        if lock.is_expired(now, grace) {
            return Err(AccessError::Expired {
                now,
                deadline: lock.deadline(grace),
            });
        }
        let approvals = lock.approvals.len();
        if approvals < self.config.approval_threshold {
            return Err(AccessError::ThresholdNotMet {
                approvals,
                threshold: self.config.approval_threshold,
            });
        }

        storage.delete(&self.namespace, &layout::timelock(lock.handle))?;
        notify(
            storage,
            "timelock_executed",
            [
                ("handle", lock.handle.to_string()),
                ("operation", lock.target_operation.to_string()),
                ("executor", format!("{executor:?}")),
            ],
        );
        info!(handle = %lock.handle, operation = %lock.target_operation, %executor, "Time-lock executed");
        Ok(lock)
    }

    /// Withdraws a pending proposal. Allowed for the proposer, the owner,
    /// and `admin` members.
    ///
    /// # Errors
    ///
    /// `TimelockNotFound`, `Unauthorized`, storage failures.
    pub fn cancel_timelocked(
        &self,
        storage: &mut StorageFacade,
        handle: TimelockHandle,
        caller: Principal,
    ) -> Result<(), AccessError> {
        let lock = self.load_timelock(storage, handle)?;
        let allowed = lock.proposer == caller
            || self.is_owner(storage, caller)?
            || self.has_role(storage, &RoleId::ADMIN, caller)?;
        if !allowed {
            return Err(deny(
                caller,
                &operations::CANCEL_TIMELOCK,
                DenialReason::NotProposer,
            ));
        }
        storage.delete(&self.namespace, &layout::timelock(handle))?;
        notify(
            storage,
            "timelock_cancelled",
            [("handle", handle.to_string()), ("by", format!("{caller:?}"))],
        );
        info!(%handle, by = %caller, "Time-lock cancelled");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
