//! # Commit-Reveal Oracle
//!
//! Two-phase randomness. A committer first stores `seal(preimage, salt)`;
//! after the minimum delay and before the window closes it reveals the
//! preimage and salt. The output mixes the preimage with entropy that was
//! not observable when the commit was made, so neither the committer nor
//! the entropy source can steer it alone.
//!
//! Records live in `__oracle.<name>`, keyed by committer, and are never
//! reused: a committer gets exactly one commitment per oracle.

use crate::config::OracleConfig;
use crate::errors::OracleError;
use crate::record::{derive_output, seal, CommitRecord};
use shared_types::{
    ChangeNotification, Clock, Component, EntropySource, Hash, OperationId, Principal, Tick,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use ur_01_storage_facade::{Namespace, StorageFacade};
use ur_03_access_control::AccessController;
use ur_04_phase_machine::PhaseMachine;

/// Commit-reveal protocol instance.
pub struct CommitRevealOracle {
    name: String,
    config: OracleConfig,
    access: Arc<AccessController>,
    entropy: Arc<dyn EntropySource>,
    clock: Arc<dyn Clock>,
    commit_phase: Option<Arc<PhaseMachine>>,
    reveal_phase: Option<Arc<PhaseMachine>>,
    namespace: Namespace,
    commit_operation: OperationId,
    reveal_operation: OperationId,
    forfeit_operation: OperationId,
}

impl std::fmt::Debug for CommitRevealOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitRevealOracle")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl CommitRevealOracle {
    /// Creates an oracle named `name`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the timing bounds are inconsistent.
    pub fn new(
        name: impl Into<String>,
        config: OracleConfig,
        access: Arc<AccessController>,
        entropy: Arc<dyn EntropySource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, OracleError> {
        config.validate()?;
        let name = name.into();
        Ok(Self {
            namespace: Namespace::reserved("oracle").child(&name),
            commit_operation: OperationId::new(format!("{name}.commit")),
            reveal_operation: OperationId::new(format!("{name}.reveal")),
            forfeit_operation: OperationId::new(format!("{name}.forfeit")),
            name,
            config,
            access,
            entropy,
            clock,
            commit_phase: None,
            reveal_phase: None,
        })
    }

    /// Only accept commits while `machine` permits `<name>.commit`.
    #[must_use]
    pub fn with_commit_phase(mut self, machine: Arc<PhaseMachine>) -> Self {
        self.commit_phase = Some(machine);
        self
    }

    /// Only accept reveals while `machine` permits `<name>.reveal`.
    #[must_use]
    pub fn with_reveal_phase(mut self, machine: Arc<PhaseMachine>) -> Self {
        self.reveal_phase = Some(machine);
        self
    }

    /// Oracle name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// `<name>.commit`, used for authorization and phase gating.
    #[must_use]
    pub fn commit_operation(&self) -> &OperationId {
        &self.commit_operation
    }

    /// `<name>.reveal`, used for phase gating.
    #[must_use]
    pub fn reveal_operation(&self) -> &OperationId {
        &self.reveal_operation
    }

    /// `<name>.forfeit`.
    #[must_use]
    pub fn forfeit_operation(&self) -> &OperationId {
        &self.forfeit_operation
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Record of `committer`, if any.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn record(
        &self,
        storage: &StorageFacade,
        committer: Principal,
    ) -> Result<Option<CommitRecord>, OracleError> {
        Ok(storage.get_record(&self.namespace, committer.as_bytes())?)
    }

    /// Every record of this oracle, ordered by committer.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn records(&self, storage: &StorageFacade) -> Result<Vec<CommitRecord>, OracleError> {
        let mut records = Vec::new();
        for key in storage.keys(&self.namespace)? {
            if let Some(record) = storage.get_record(&self.namespace, &key)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn load(&self, storage: &StorageFacade, committer: Principal) -> Result<CommitRecord, OracleError> {
        self.record(storage, committer)?
            .ok_or(OracleError::NotCommitted(committer))
    }

    // =========================================================================
    // PROTOCOL
    // =========================================================================

    /// Stores `sealed_value` for `committer` at the current tick.
    ///
    /// One-shot: the record stays after a reveal or forfeit, so a committer
    /// who has seen an output cannot commit again for a fresh one. Oracles
    /// that need rounds are registered under one name per round.
    ///
    /// # Errors
    ///
    /// `Access` (restricted oracle), `Phase` (commit phase closed),
    /// `AlreadyCommitted`, storage failures.
    pub fn commit(
        &self,
        storage: &mut StorageFacade,
        committer: Principal,
        sealed_value: Hash,
    ) -> Result<CommitRecord, OracleError> {
        if self.config.restricted {
            self.access
                .authorize(storage, committer, &self.commit_operation)?;
        }
        if let Some(machine) = &self.commit_phase {
            machine.require(storage, &self.commit_operation)?;
        }
        if self.record(storage, committer)?.is_some() {
            return Err(OracleError::AlreadyCommitted(committer));
        }

        let record = CommitRecord {
            committer,
            sealed_value,
            commit_tick: self.clock.now(),
            revealed: false,
            forfeited: false,
            output: None,
        };
        storage.put_record(&self.namespace, committer.as_bytes(), &record)?;
        storage.publish(ChangeNotification::fields(
            Component::CommitReveal,
            "committed",
            [
                ("oracle", self.name.clone()),
                ("committer", format!("{committer:?}")),
                ("commit_tick", record.commit_tick.to_string()),
            ],
        ));
        info!(oracle = %self.name, %committer, commit_tick = %record.commit_tick, "Commitment stored");
        Ok(record)
    }

    /// Opens the commitment and returns the derived randomness.
    ///
    /// Checks, in order: a live record exists, the reveal phase is open
    /// (if configured), `now >= commit + min_delay`, `now < commit +
    /// window`, the seal matches, and entropy observed in `(commit, now]`
    /// is available.
    ///
    /// # Errors
    ///
    /// `NotCommitted`, `AlreadyRevealed`, `Phase`, `TooEarly`, `Expired`,
    /// `InvalidPreimage`, `EntropyUnavailable`, `StaleEntropy`, storage
    /// failures.
    pub fn reveal(
        &self,
        storage: &mut StorageFacade,
        committer: Principal,
        preimage: &[u8],
        salt: &[u8],
    ) -> Result<Hash, OracleError> {
        let mut record = self.load(storage, committer)?;
        if record.revealed {
            return Err(OracleError::AlreadyRevealed(committer));
        }
        if let Some(machine) = &self.reveal_phase {
            machine.require(storage, &self.reveal_operation)?;
        }

        let now = self.clock.now();
        let deadline = record.reveal_closes(self.config.reveal_window);
        if record.forfeited {
            return Err(OracleError::Expired { now, deadline });
        }
        let earliest = record.reveal_opens(self.config.min_reveal_delay);
        if now < earliest {
            debug!(oracle = %self.name, %committer, %now, %earliest, "Reveal too early");
            return Err(OracleError::TooEarly { now, earliest });
        }
        if now >= deadline {
            return Err(OracleError::Expired { now, deadline });
        }
        if seal(preimage, salt) != record.sealed_value {
            warn!(oracle = %self.name, %committer, "Reveal with wrong preimage");
            return Err(OracleError::InvalidPreimage);
        }

        let entropy = self
            .entropy
            .entropy_at(now)
            .ok_or(OracleError::EntropyUnavailable(now))?;
        if entropy.observed_at <= record.commit_tick || entropy.observed_at > now {
            warn!(oracle = %self.name, observed_at = %entropy.observed_at, "Stale entropy rejected");
            return Err(OracleError::StaleEntropy {
                observed_at: entropy.observed_at,
                commit_tick: record.commit_tick,
                now,
            });
        }

        let output = derive_output(preimage, &entropy.value);
        record.revealed = true;
        record.output = Some(output);
        storage.put_record(&self.namespace, committer.as_bytes(), &record)?;
        storage.publish(ChangeNotification::fields(
            Component::CommitReveal,
            "revealed",
            [
                ("oracle", self.name.clone()),
                ("committer", format!("{committer:?}")),
                ("output", format!("{output:?}")),
                ("entropy_tick", entropy.observed_at.to_string()),
            ],
        ));
        info!(oracle = %self.name, %committer, %output, "Commitment revealed");
        Ok(output)
    }

    /// Marks an unrevealed commitment whose window has closed as forfeited.
    /// Anyone may call this; forfeiting twice is a no-op.
    ///
    /// # Errors
    ///
    /// `NotCommitted`, `AlreadyRevealed`, `NotExpired`, storage failures.
    pub fn forfeit(
        &self,
        storage: &mut StorageFacade,
        committer: Principal,
    ) -> Result<CommitRecord, OracleError> {
        let mut record = self.load(storage, committer)?;
        if record.revealed {
            return Err(OracleError::AlreadyRevealed(committer));
        }
        if record.forfeited {
            return Ok(record);
        }
        let now = self.clock.now();
        let deadline = record.reveal_closes(self.config.reveal_window);
        if now < deadline {
            return Err(OracleError::NotExpired { now, deadline });
        }

        record.forfeited = true;
        storage.put_record(&self.namespace, committer.as_bytes(), &record)?;
        storage.publish(ChangeNotification::fields(
            Component::CommitReveal,
            "forfeited",
            [
                ("oracle", self.name.clone()),
                ("committer", format!("{committer:?}")),
            ],
        ));
        info!(oracle = %self.name, %committer, "Commitment forfeited");
        Ok(record)
    }

    /// Current tick.
    #[must_use]
    pub fn now(&self) -> Tick {
        self.clock.now()
    }
}

// =============================================================================
// TESTS
// =============================================================================
