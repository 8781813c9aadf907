//! # Phase Machine
//!
//! Persists `{current, entered_at}` under the definition name in the
//! `__phase` namespace and gates operations by the current phase.
//!
//! Automatic transitions are applied lazily: readers see the *effective*
//! state (the stored state advanced through every automatic rule that has
//! come due), and `tick` persists it. A chain of automatic transitions
//! enters each phase at the instant its rule became due, not at the time
//! of the tick that observed it.

use crate::definition::{PhaseDefinition, PhaseId, TransitionRule};
use crate::errors::{PhaseError, TransitionFailure};
use serde::{Deserialize, Serialize};
use shared_types::{ChangeNotification, Clock, Component, OperationId, Principal, Tick};
use std::sync::Arc;
use tracing::{debug, info, warn};
use ur_01_storage_facade::{Namespace, StorageFacade};
use ur_03_access_control::AccessController;

/// Persisted lifecycle position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseState {
    /// Current phase.
    pub current: PhaseId,
    /// Tick at which `current` was entered.
    pub entered_at: Tick,
}

/// A completed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTransition {
    /// Phase left.
    pub from: PhaseId,
    /// Phase entered.
    pub to: PhaseId,
    /// Entry tick of `to`.
    pub at: Tick,
    /// Fired by `tick` rather than by a caller.
    pub automatic: bool,
}

/// Lifecycle gate for one application definition.
pub struct PhaseMachine {
    definition: PhaseDefinition,
    access: Arc<AccessController>,
    clock: Arc<dyn Clock>,
    namespace: Namespace,
}

impl std::fmt::Debug for PhaseMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseMachine")
            .field("definition", &self.definition.name())
            .finish_non_exhaustive()
    }
}

impl PhaseMachine {
    /// Creates a machine for `definition`.
    #[must_use]
    pub fn new(
        definition: PhaseDefinition,
        access: Arc<AccessController>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            definition,
            access,
            clock,
            namespace: Namespace::reserved("phase"),
        }
    }

    /// The lifecycle definition.
    #[must_use]
    pub fn definition(&self) -> &PhaseDefinition {
        &self.definition
    }

    fn key(&self) -> &[u8] {
        self.definition.name().as_bytes()
    }

    /// Enters the initial phase at the current tick.
    ///
    /// # Errors
    ///
    /// `AlreadyInitialized`, storage failures.
    pub fn initialize(&self, storage: &mut StorageFacade) -> Result<PhaseState, PhaseError> {
        if storage.contains(&self.namespace, self.key())? {
            return Err(PhaseError::AlreadyInitialized(
                self.definition.name().to_string(),
            ));
        }
        let state = PhaseState {
            current: self.definition.initial().clone(),
            entered_at: self.clock.now(),
        };
        storage.put_record(&self.namespace, self.key(), &state)?;
        info!(machine = self.definition.name(), phase = %state.current, "Phase machine initialized");
        Ok(state)
    }

    /// Returns true once `initialize` has run.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn is_initialized(&self, storage: &StorageFacade) -> Result<bool, PhaseError> {
        Ok(storage.contains(&self.namespace, self.key())?)
    }

    /// Stored state, without pending automatic transitions.
    ///
    /// # Errors
    ///
    /// `NotInitialized`, `UnknownStoredPhase`, storage failures.
    pub fn state(&self, storage: &StorageFacade) -> Result<PhaseState, PhaseError> {
        let state: PhaseState = storage
            .get_record(&self.namespace, self.key())?
            .ok_or_else(|| PhaseError::NotInitialized(self.definition.name().to_string()))?;
        if !self.definition.contains(&state.current) {
            return Err(PhaseError::UnknownStoredPhase(state.current));
        }
        Ok(state)
    }

    /// Stored state advanced through every automatic transition due now.
    ///
    /// # Errors
    ///
    /// Same as [`PhaseMachine::state`], plus predicate storage failures.
    pub fn effective_state(&self, storage: &StorageFacade) -> Result<PhaseState, PhaseError> {
        let (state, _) = self.project(storage, self.state(storage)?, self.clock.now())?;
        Ok(state)
    }

    /// Returns true if `operation` is permitted in the effective phase.
    ///
    /// # Errors
    ///
    /// Same as [`PhaseMachine::effective_state`].
    pub fn can_execute(
        &self,
        storage: &StorageFacade,
        operation: &OperationId,
    ) -> Result<bool, PhaseError> {
        let state = self.effective_state(storage)?;
        Ok(self.definition.permits(&state.current, operation))
    }

    /// Like [`PhaseMachine::can_execute`], as a `Result`.
    ///
    /// # Errors
    ///
    /// `OperationNotPermitted`, plus everything `can_execute` returns.
    pub fn require(&self, storage: &StorageFacade, operation: &OperationId) -> Result<(), PhaseError> {
        let state = self.effective_state(storage)?;
        if self.definition.permits(&state.current, operation) {
            return Ok(());
        }
        debug!(%operation, phase = %state.current, "Operation not permitted in phase");
        Err(PhaseError::OperationNotPermitted {
            operation: operation.clone(),
            phase: state.current,
        })
    }

    /// Persists every automatic transition that has come due.
    ///
    /// # Errors
    ///
    /// Same as [`PhaseMachine::effective_state`].
    pub fn tick(&self, storage: &mut StorageFacade) -> Result<Vec<PhaseTransition>, PhaseError> {
        let (state, hops) = self.project(storage, self.state(storage)?, self.clock.now())?;
        if !hops.is_empty() {
            storage.put_record(&self.namespace, self.key(), &state)?;
            self.announce(storage, &hops, None);
        }
        Ok(hops)
    }

    /// Moves to `target` through a manual rule.
    ///
    /// Pending automatic transitions are applied first. Checks, in order:
    /// the current phase is not terminal, a rule leads to `target`, the
    /// caller is authorized for the rule's operation, the minimum dwell has
    /// elapsed, the predicate holds.
    ///
    /// # Errors
    ///
    /// `InvalidTransition`, `Access` (unauthorized), `TooEarly`, storage
    /// failures.
    pub fn transition_to(
        &self,
        storage: &mut StorageFacade,
        target: &PhaseId,
        principal: Principal,
    ) -> Result<PhaseState, PhaseError> {
        let now = self.clock.now();
        let (state, mut hops) = self.project(storage, self.state(storage)?, now)?;
        let invalid = |reason| PhaseError::InvalidTransition {
            from: state.current.clone(),
            to: target.clone(),
            reason,
        };

        if self.definition.is_terminal(&state.current) {
            return Err(invalid(TransitionFailure::Terminal));
        }
        let rule = self
            .definition
            .rule(&state.current, target)
            .ok_or_else(|| invalid(TransitionFailure::NoSuchEdge))?;
        if let Some(operation) = &rule.authorization {
            self.access.authorize(storage, principal, operation)?;
        }
        let earliest = state.entered_at.plus(rule.min_dwell);
        if now < earliest {
            return Err(PhaseError::TooEarly { now, earliest });
        }
        if !rule.predicate_holds(storage)? {
            warn!(from = %state.current, to = %target, "Transition predicate failed");
            return Err(invalid(TransitionFailure::PredicateFailed));
        }

        let next = PhaseState {
            current: target.clone(),
            entered_at: now,
        };
        storage.put_record(&self.namespace, self.key(), &next)?;
        hops.push(PhaseTransition {
            from: state.current.clone(),
            to: target.clone(),
            at: now,
            automatic: false,
        });
        self.announce(storage, &hops, Some(principal));
        Ok(next)
    }

    /// Applies due automatic rules to `state` without writing.
    ///
    /// Among several due rules the one that came due first wins; ties go
    /// to declaration order. Runs until no rule is due, so timed cycles
    /// land on the phase that is current at `now`. Hops that do not move
    /// `entered_at` forward are capped at the number of rules, which ends
    /// zero-dwell cycles.
    fn project(
        &self,
        storage: &StorageFacade,
        mut state: PhaseState,
        now: Tick,
    ) -> Result<(PhaseState, Vec<PhaseTransition>), PhaseError> {
        let mut hops = Vec::new();
        let mut stalled = 0usize;
        loop {
            if self.definition.is_terminal(&state.current) {
                break;
            }
            if stalled >= self.definition.transitions().len() {
                debug!(machine = self.definition.name(), phase = %state.current, "Zero-dwell cycle stopped");
                break;
            }
            let mut next: Option<(Tick, &TransitionRule)> = None;
            for rule in self.definition.automatic_from(&state.current) {
                let due = state.entered_at.plus(rule.min_dwell);
                if due > now || next.is_some_and(|(best, _)| best <= due) {
                    continue;
                }
                if rule.predicate_holds(storage)? {
                    next = Some((due, rule));
                }
            }
            let Some((due, rule)) = next else {
                break;
            };
            if due > state.entered_at {
                stalled = 0;
            } else {
                stalled += 1;
            }
            hops.push(PhaseTransition {
                from: state.current.clone(),
                to: rule.to.clone(),
                at: due,
                automatic: true,
            });
            state = PhaseState {
                current: rule.to.clone(),
                entered_at: due,
            };
        }
        Ok((state, hops))
    }

    fn announce(
        &self,
        storage: &mut StorageFacade,
        hops: &[PhaseTransition],
        principal: Option<Principal>,
    ) {
        for hop in hops {
            info!(
                machine = self.definition.name(),
                from = %hop.from,
                to = %hop.to,
                at = %hop.at,
                automatic = hop.automatic,
                "Phase transition"
            );
            let mut fields = vec![
                ("machine", self.definition.name().to_string()),
                ("from", hop.from.to_string()),
                ("to", hop.to.to_string()),
                ("at", hop.at.to_string()),
                ("automatic", hop.automatic.to_string()),
            ];
            if let (false, Some(principal)) = (hop.automatic, principal) {
                fields.push(("by", format!("{principal:?}")));
            }
            storage.publish(ChangeNotification::fields(
                Component::PhaseMachine,
                "phase_transitioned",
                fields,
            ));
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
