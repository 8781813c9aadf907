//! # Runtime
//!
//! The dispatch pipeline and the administrative surface around it.
//!
//! ```text
//! invoke(caller, op, payload)
//!   └─ write lock ─ transaction
//!        └─ ModuleRegistry::resolve          (index -> descriptor -> code)
//!        └─ DispatchGuard::guarded_call(op)  (reentrancy + checkpoint)
//!             ├─ EmergencyStop::check
//!             ├─ AccessController::authorize
//!             ├─ PhaseMachine::tick + require
//!             └─ Module::call(ModuleContext)  ── forward ──┐
//!                                                          │
//!        (nested calls re-enter the same pipeline) ◄───────┘
//! ```
//!
//! Every mutating entry point holds the write lock for the whole call and
//! runs in a storage transaction. Queries take the read lock.

use crate::config::RuntimeConfig;
use crate::errors::{into_module_error, RuntimeError};
use parking_lot::RwLock;
use shared_types::{keccak256, Clock, Hash, OperationId, Principal, RoleId, Tick};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};
use ur_01_storage_facade::{StorageError, StorageFacade};
use ur_02_dispatch_guard::DispatchGuard;
use ur_03_access_control::{
    AccessController, ApprovalStatus, EmergencyStop, OperationPolicy, TimeLock, TimelockHandle,
};
use ur_04_phase_machine::{PhaseId, PhaseMachine, PhaseState, PhaseTransition};
use ur_05_commit_reveal::{CommitRecord, CommitRevealOracle};
use ur_06_module_registry::{CallForwarder, ModuleCall, ModuleDescriptor, ModuleError, ModuleRegistry};
use ur_telemetry::{
    HistogramTimer, AUTHORIZATION_DENIALS, GUARDED_CALLS, INVOCATION_DURATION, MODULE_ACTIVATIONS,
    PHASE_TRANSITIONS,
};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Authorization {
    /// Run the owner/role rules for the operation.
    Check,
    /// A consumed time-lock already authorized this exact call.
    Timelocked,
}

/// The composed runtime. Build one with [`crate::RuntimeBuilder`].
pub struct Runtime {
    pub(crate) config: RuntimeConfig,
    pub(crate) storage: RwLock<StorageFacade>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) access: Arc<AccessController>,
    pub(crate) emergency: EmergencyStop,
    pub(crate) guard: DispatchGuard,
    pub(crate) registry: ModuleRegistry,
    pub(crate) phases: Option<Arc<PhaseMachine>>,
    pub(crate) oracles: BTreeMap<String, CommitRevealOracle>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("app_namespace", &self.config.app_namespace)
            .field("phases", &self.phases.is_some())
            .field("oracles", &self.oracles.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

struct PipelineForwarder<'r> {
    runtime: &'r Runtime,
}

impl CallForwarder for PipelineForwarder<'_> {
    fn forward(&self, storage: &mut StorageFacade, call: ModuleCall) -> Result<Vec<u8>, ModuleError> {
        debug!(operation = %call.operation, "Forwarding nested call");
        self.runtime
            .dispatch(storage, &call, Authorization::Check)
            .map_err(|err| into_module_error(&call.operation, err))
    }
}

impl Runtime {
    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Current tick.
    #[must_use]
    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    /// Shared access controller.
    #[must_use]
    pub fn access(&self) -> &Arc<AccessController> {
        &self.access
    }

    /// Hash a time-lock proposal must carry to authorize
    /// [`Runtime::invoke_timelocked`] with `payload`.
    #[must_use]
    pub fn payload_hash(payload: &[u8]) -> Hash {
        keccak256(payload)
    }

    /// Runs `f` against the last committed state.
    pub fn query<T>(&self, f: impl FnOnce(&StorageFacade) -> T) -> T {
        f(&*self.storage.read())
    }

    fn read<T, E>(&self, f: impl FnOnce(&StorageFacade) -> Result<T, E>) -> Result<T, RuntimeError>
    where
        RuntimeError: From<E>,
    {
        f(&*self.storage.read()).map_err(RuntimeError::from)
    }

    fn mutate<T, E>(
        &self,
        f: impl FnOnce(&mut StorageFacade) -> Result<T, E>,
    ) -> Result<T, RuntimeError>
    where
        E: From<StorageError>,
        RuntimeError: From<E>,
    {
        self.storage.write().atomically(f).map_err(RuntimeError::from)
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    /// Dispatches `operation` to the active module.
    ///
    /// # Errors
    ///
    /// `Registry(NoActiveModule)`, `Reentrant`, `Access` (unauthorized,
    /// halted, requires time-lock), `Phase(OperationNotPermitted)`, the
    /// module's own `Module` errors, storage failures. Nothing is written on
    /// error.
    pub fn invoke(
        &self,
        caller: Principal,
        operation: OperationId,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Vec<u8>, RuntimeError> {
        let call = ModuleCall::new(operation, caller, payload);
        self.instrumented(&call, |storage| {
            storage.atomically(|s| self.dispatch(s, &call, Authorization::Check))
        })
    }

    /// Dispatches a time-locked operation by consuming `handle`. The
    /// proposal must target `operation` and carry
    /// [`Runtime::payload_hash`] of `payload`; it is consumed only if the
    /// call succeeds.
    ///
    /// # Errors
    ///
    /// The time-lock errors of `execute_timelocked_for`, plus everything
    /// [`Runtime::invoke`] returns except the role check.
    pub fn invoke_timelocked(
        &self,
        executor: Principal,
        handle: TimelockHandle,
        operation: OperationId,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Vec<u8>, RuntimeError> {
        let call = ModuleCall::new(operation, executor, payload);
        let payload_hash = Self::payload_hash(&call.payload);
        self.instrumented(&call, |storage| {
            storage.atomically(|s| -> Result<_, RuntimeError> {
                self.access.execute_timelocked_for(
                    s,
                    handle,
                    executor,
                    &call.operation,
                    Some(payload_hash),
                )?;
                self.dispatch(s, &call, Authorization::Timelocked)
            })
        })
    }

    fn instrumented(
        &self,
        call: &ModuleCall,
        run: impl FnOnce(&mut StorageFacade) -> Result<Vec<u8>, RuntimeError>,
    ) -> Result<Vec<u8>, RuntimeError> {
        let invocation_id = Uuid::new_v4();
        let span = info_span!(
            "invoke",
            %invocation_id,
            operation = %call.operation,
            caller = %call.caller
        );
        let _entered = span.enter();
        let _timer = HistogramTimer::new(&INVOCATION_DURATION);

        let result = run(&mut *self.storage.write());
        match &result {
            Ok(output) => {
                GUARDED_CALLS.with_label_values(&["ok"]).inc();
                debug!(output_len = output.len(), "Invocation completed");
            }
            Err(err) => {
                GUARDED_CALLS.with_label_values(&[err.outcome_label()]).inc();
                if err.is_unauthorized() {
                    AUTHORIZATION_DENIALS
                        .with_label_values(&[call.operation.as_str()])
                        .inc();
                }
                warn!(error = %err, "Invocation failed");
            }
        }
        result
    }

    fn dispatch(
        &self,
        storage: &mut StorageFacade,
        call: &ModuleCall,
        authorization: Authorization,
    ) -> Result<Vec<u8>, RuntimeError> {
        let resolved = self.registry.resolve(storage)?;
        self.guard
            .guarded_call(storage, &call.operation, |s| -> Result<_, RuntimeError> {
                self.emergency.check(s, &call.operation)?;
                if authorization == Authorization::Check {
                    self.access.authorize(s, call.caller, &call.operation)?;
                }
                if let Some(machine) = &self.phases {
                    count_transitions(&machine.tick(s)?);
                    machine.require(s, &call.operation)?;
                }
                let forwarder = PipelineForwarder { runtime: self };
                let mut ctx = self
                    .registry
                    .context(s, &resolved.descriptor, call.caller)
                    .with_forwarder(&forwarder);
                Ok(resolved.module.call(&mut ctx, call)?)
            })
    }

    /// Returns true while a call for `operation` is in flight.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn is_in_progress(&self, operation: &OperationId) -> Result<bool, RuntimeError> {
        self.read(|s| self.guard.is_in_progress(s, operation))
    }

    // =========================================================================
    // MODULES
    // =========================================================================

    /// Activates a new implementation module.
    ///
    /// Rejected while halted unless the `module.upgrade` policy is
    /// `allowed_when_halted`.
    ///
    /// # Errors
    ///
    /// `Access(Halted)`, see [`ModuleRegistry::activate`].
    pub fn activate_module(
        &self,
        principal: Principal,
        descriptor: ModuleDescriptor,
    ) -> Result<ModuleDescriptor, RuntimeError> {
        let active = self.mutate(|s| -> Result<_, RuntimeError> {
            self.emergency.check(s, &OperationId::UPGRADE)?;
            Ok(self.registry.activate(s, principal, descriptor)?)
        })?;
        MODULE_ACTIVATIONS.inc();
        Ok(active)
    }

    /// Activates a module through an approved `module.upgrade` time-lock.
    ///
    /// # Errors
    ///
    /// `Access(Halted)`, see [`ModuleRegistry::activate_timelocked`].
    pub fn activate_module_timelocked(
        &self,
        principal: Principal,
        handle: TimelockHandle,
        descriptor: ModuleDescriptor,
    ) -> Result<ModuleDescriptor, RuntimeError> {
        let active = self.mutate(|s| -> Result<_, RuntimeError> {
            self.emergency.check(s, &OperationId::UPGRADE)?;
            Ok(self
                .registry
                .activate_timelocked(s, principal, handle, descriptor)?)
        })?;
        MODULE_ACTIVATIONS.inc();
        Ok(active)
    }

    /// Active module descriptor.
    ///
    /// # Errors
    ///
    /// `Registry(NoActiveModule)`, storage failures.
    pub fn current_module(&self) -> Result<ModuleDescriptor, RuntimeError> {
        self.read(|s| self.registry.current(s))
    }

    /// Every module ever activated, oldest first.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn module_history(&self) -> Result<Vec<ModuleDescriptor>, RuntimeError> {
        self.read(|s| self.registry.history(s))
    }

    // =========================================================================
    // ACCESS CONTROL
    // =========================================================================

    /// Current owner.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn owner(&self) -> Result<Option<Principal>, RuntimeError> {
        self.read(|s| self.access.owner(s))
    }

    /// Hands ownership to `new_owner`.
    ///
    /// # Errors
    ///
    /// `Access(Unauthorized)` unless `caller` is the owner.
    pub fn transfer_ownership(&self, caller: Principal, new_owner: Principal) -> Result<(), RuntimeError> {
        self.mutate(|s| self.access.transfer_ownership(s, caller, new_owner))
    }

    /// Returns true if `principal` holds `role`.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn has_role(&self, role: &RoleId, principal: Principal) -> Result<bool, RuntimeError> {
        self.read(|s| self.access.has_role(s, role, principal))
    }

    /// Grants `role` to `principal`.
    ///
    /// # Errors
    ///
    /// `Access(Unauthorized)` unless `caller` is the owner or holds the
    /// role's admin role.
    pub fn grant_role(&self, caller: Principal, role: &RoleId, principal: Principal) -> Result<(), RuntimeError> {
        self.mutate(|s| self.access.grant_role(s, caller, role, principal))
    }

    /// Revokes `role` from `principal`.
    ///
    /// # Errors
    ///
    /// As [`Runtime::grant_role`].
    pub fn revoke_role(&self, caller: Principal, role: &RoleId, principal: Principal) -> Result<(), RuntimeError> {
        self.mutate(|s| self.access.revoke_role(s, caller, role, principal))
    }

    /// Drops `caller`'s own membership in `role`.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn renounce_role(&self, caller: Principal, role: &RoleId) -> Result<(), RuntimeError> {
        self.mutate(|s| self.access.renounce_role(s, caller, role))
    }

    /// Makes `admin` the admin role of `role`.
    ///
    /// # Errors
    ///
    /// `Access(Unauthorized)` unless `caller` is the owner.
    pub fn set_role_admin(&self, caller: Principal, role: &RoleId, admin: &RoleId) -> Result<(), RuntimeError> {
        self.mutate(|s| self.access.set_role_admin(s, caller, role, admin))
    }

    /// Registers or replaces the policy of `operation`.
    ///
    /// # Errors
    ///
    /// `Access(Unauthorized)` unless `caller` is the owner or an admin.
    pub fn register_operation(
        &self,
        caller: Principal,
        operation: &OperationId,
        policy: OperationPolicy,
    ) -> Result<(), RuntimeError> {
        self.mutate(|s| self.access.register_operation(s, caller, operation, policy))
    }

    /// Proposes a time-locked execution of `operation`.
    ///
    /// # Errors
    ///
    /// See [`AccessController::propose_timelocked`].
    pub fn propose_timelocked(
        &self,
        proposer: Principal,
        operation: &OperationId,
        earliest_execute_at: Tick,
        payload_hash: Option<Hash>,
    ) -> Result<TimelockHandle, RuntimeError> {
        self.mutate(|s| {
            self.access
                .propose_timelocked(s, proposer, operation, earliest_execute_at, payload_hash)
        })
    }

    /// Records an approval.
    ///
    /// # Errors
    ///
    /// See [`AccessController::approve_timelocked`].
    pub fn approve_timelocked(
        &self,
        handle: TimelockHandle,
        approver: Principal,
    ) -> Result<ApprovalStatus, RuntimeError> {
        self.mutate(|s| self.access.approve_timelocked(s, handle, approver))
    }

    /// Withdraws a pending proposal.
    ///
    /// # Errors
    ///
    /// See [`AccessController::cancel_timelocked`].
    pub fn cancel_timelocked(&self, handle: TimelockHandle, caller: Principal) -> Result<(), RuntimeError> {
        self.mutate(|s| self.access.cancel_timelocked(s, handle, caller))
    }

    /// Pending proposal `handle`, if any.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn timelock(&self, handle: TimelockHandle) -> Result<Option<TimeLock>, RuntimeError> {
        self.read(|s| self.access.timelock(s, handle))
    }

    /// Engages the emergency stop.
    ///
    /// # Errors
    ///
    /// `Access(Unauthorized)` for `emergency.halt`.
    pub fn halt(&self, caller: Principal) -> Result<(), RuntimeError> {
        self.mutate(|s| self.emergency.halt(s, caller))
    }

    /// Clears the emergency stop.
    ///
    /// # Errors
    ///
    /// `Access(Unauthorized)` for `emergency.resume`.
    pub fn resume(&self, caller: Principal) -> Result<(), RuntimeError> {
        self.mutate(|s| self.emergency.resume(s, caller))
    }

    /// Returns true while the emergency stop is engaged.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn is_halted(&self) -> Result<bool, RuntimeError> {
        self.read(|s| self.emergency.is_halted(s))
    }

    // =========================================================================
    // PHASES
    // =========================================================================

    fn machine(&self) -> Result<&PhaseMachine, RuntimeError> {
        self.phases.as_deref().ok_or(RuntimeError::NoPhaseMachine)
    }

    /// Effective phase, including automatic transitions already due.
    ///
    /// # Errors
    ///
    /// `NoPhaseMachine`, storage failures.
    pub fn phase_state(&self) -> Result<PhaseState, RuntimeError> {
        let machine = self.machine()?;
        self.read(|s| machine.effective_state(s))
    }

    /// Returns true if the effective phase permits `operation`.
    ///
    /// # Errors
    ///
    /// `NoPhaseMachine`, storage failures.
    pub fn can_execute(&self, operation: &OperationId) -> Result<bool, RuntimeError> {
        let machine = self.machine()?;
        self.read(|s| machine.can_execute(s, operation))
    }

    /// Persists automatic transitions that are due.
    ///
    /// # Errors
    ///
    /// `NoPhaseMachine`, storage failures.
    pub fn advance_phases(&self) -> Result<Vec<PhaseTransition>, RuntimeError> {
        let machine = self.machine()?;
        let hops = self.mutate(|s| machine.tick(s))?;
        count_transitions(&hops);
        Ok(hops)
    }

    /// Manual transition to `target`.
    ///
    /// # Errors
    ///
    /// `NoPhaseMachine`, `Phase(InvalidTransition | TooEarly)`,
    /// `Access(Unauthorized)`, storage failures.
    pub fn transition_phase(&self, principal: Principal, target: &PhaseId) -> Result<PhaseState, RuntimeError> {
        let machine = self.machine()?;
        let state = self.mutate(|s| machine.transition_to(s, target, principal))?;
        PHASE_TRANSITIONS
            .with_label_values(&[state.current.as_str()])
            .inc();
        Ok(state)
    }

    // =========================================================================
    // COMMIT-REVEAL
    // =========================================================================

    fn oracle(&self, name: &str) -> Result<&CommitRevealOracle, RuntimeError> {
        self.oracles
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownOracle(name.to_string()))
    }

    /// Commits `sealed_value` to oracle `name`.
    ///
    /// # Errors
    ///
    /// `UnknownOracle`, `Access(Halted)` for `<name>.commit`, see
    /// [`CommitRevealOracle::commit`].
    pub fn commit(&self, name: &str, committer: Principal, sealed_value: Hash) -> Result<CommitRecord, RuntimeError> {
        let oracle = self.oracle(name)?;
        self.mutate(|s| -> Result<_, RuntimeError> {
            self.emergency.check(s, oracle.commit_operation())?;
            Ok(oracle.commit(s, committer, sealed_value)?)
        })
    }

    /// Reveals to oracle `name` and returns the derived randomness.
    ///
    /// # Errors
    ///
    /// `UnknownOracle`, `Access(Halted)` for `<name>.reveal`, see
    /// [`CommitRevealOracle::reveal`].
    pub fn reveal(
        &self,
        name: &str,
        committer: Principal,
        preimage: &[u8],
        salt: &[u8],
    ) -> Result<Hash, RuntimeError> {
        let oracle = self.oracle(name)?;
        let output = self.mutate(|s| -> Result<_, RuntimeError> {
            self.emergency.check(s, oracle.reveal_operation())?;
            Ok(oracle.reveal(s, committer, preimage, salt)?)
        })?;
        info!(oracle = name, %committer, "Randomness revealed");
        Ok(output)
    }

    /// Marks an unrevealed commitment whose window closed as forfeited.
    ///
    /// # Errors
    ///
    /// `UnknownOracle`, `Access(Halted)` for `<name>.forfeit`, see
    /// [`CommitRevealOracle::forfeit`].
    pub fn forfeit(&self, name: &str, committer: Principal) -> Result<CommitRecord, RuntimeError> {
        let oracle = self.oracle(name)?;
        self.mutate(|s| -> Result<_, RuntimeError> {
            self.emergency.check(s, oracle.forfeit_operation())?;
            Ok(oracle.forfeit(s, committer)?)
        })
    }

    /// Commitment of `committer` in oracle `name`.
    ///
    /// # Errors
    ///
    /// `UnknownOracle`, storage failures.
    pub fn commit_record(&self, name: &str, committer: Principal) -> Result<Option<CommitRecord>, RuntimeError> {
        let oracle = self.oracle(name)?;
        self.read(|s| oracle.record(s, committer))
    }
}

fn count_transitions(hops: &[PhaseTransition]) {
    for hop in hops {
        PHASE_TRANSITIONS.with_label_values(&[hop.to.as_str()]).inc();
    }
}
