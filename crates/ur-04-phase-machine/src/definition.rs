//! # Phase Definitions
//!
//! The application supplies its lifecycle as a set of phases, the
//! operations each phase permits, and the rules connecting them. A
//! definition is validated once when built and is immutable afterwards.

use crate::errors::DefinitionError;
use serde::{Deserialize, Serialize};
use shared_types::OperationId;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use ur_01_storage_facade::{StorageError, StorageFacade};

/// Name of a lifecycle phase.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhaseId(Cow<'static, str>);

impl PhaseId {
    /// Creates a phase id from a static string.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a phase id from an owned string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The phase name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhaseId({})", self.0)
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for PhaseId {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// Storage predicate guarding a transition.
pub type Predicate = Arc<dyn Fn(&StorageFacade) -> Result<bool, StorageError> + Send + Sync>;

/// A guarded edge between two phases.
#[derive(Clone)]
pub struct TransitionRule {
    /// Source phase.
    pub from: PhaseId,
    /// Target phase.
    pub to: PhaseId,
    /// Ticks that must elapse in `from` before the edge opens.
    pub min_dwell: u64,
    /// Operation a caller must be authorized for.
    pub authorization: Option<OperationId>,
    /// Extra condition over storage.
    pub predicate: Option<Predicate>,
    /// Fires on `tick` once due, without a caller.
    pub automatic: bool,
}

impl fmt::Debug for TransitionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionRule")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("min_dwell", &self.min_dwell)
            .field("authorization", &self.authorization)
            .field("predicate", &self.predicate.is_some())
            .field("automatic", &self.automatic)
            .finish()
    }
}

impl TransitionRule {
    /// Manual, unguarded edge.
    #[must_use]
    pub fn new(from: impl Into<PhaseId>, to: impl Into<PhaseId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            min_dwell: 0,
            authorization: None,
            predicate: None,
            automatic: false,
        }
    }

    /// Requires `ticks` in the source phase first.
    #[must_use]
    pub fn after(mut self, ticks: u64) -> Self {
        self.min_dwell = ticks;
        self
    }

    /// Requires the caller to be authorized for `operation`.
    #[must_use]
    pub fn authorized_by(mut self, operation: OperationId) -> Self {
        self.authorization = Some(operation);
        self
    }

    /// Requires `predicate` to hold over storage.
    #[must_use]
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&StorageFacade) -> Result<bool, StorageError> + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Fires on `tick` once the dwell has elapsed and the predicate holds.
    #[must_use]
    pub fn automatic(mut self) -> Self {
        self.automatic = true;
        self
    }

    /// Evaluates the predicate (true if there is none).
    ///
    /// # Errors
    ///
    /// Storage failures raised by the predicate.
    pub fn predicate_holds(&self, storage: &StorageFacade) -> Result<bool, StorageError> {
        match &self.predicate {
            Some(predicate) => predicate(storage),
            None => Ok(true),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PhaseEntry {
    terminal: bool,
    permitted: BTreeSet<OperationId>,
}

/// A validated lifecycle.
#[derive(Debug, Clone)]
pub struct PhaseDefinition {
    name: String,
    initial: PhaseId,
    phases: BTreeMap<PhaseId, PhaseEntry>,
    transitions: Vec<TransitionRule>,
}

impl PhaseDefinition {
    /// Starts a definition named `name` (also its storage key).
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PhaseDefinitionBuilder {
        PhaseDefinitionBuilder {
            name: name.into(),
            initial: None,
            phases: Vec::new(),
            permits: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Definition name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Initial phase.
    #[must_use]
    pub fn initial(&self) -> &PhaseId {
        &self.initial
    }

    /// Returns true if `phase` is declared.
    #[must_use]
    pub fn contains(&self, phase: &PhaseId) -> bool {
        self.phases.contains_key(phase)
    }

    /// Returns true if `phase` is terminal.
    #[must_use]
    pub fn is_terminal(&self, phase: &PhaseId) -> bool {
        self.phases.get(phase).is_some_and(|p| p.terminal)
    }

    /// Returns true if `operation` is permitted in `phase`.
    #[must_use]
    pub fn permits(&self, phase: &PhaseId, operation: &OperationId) -> bool {
        self.phases
            .get(phase)
            .is_some_and(|p| p.permitted.contains(operation))
    }

    /// All rules, in declaration order.
    #[must_use]
    pub fn transitions(&self) -> &[TransitionRule] {
        &self.transitions
    }

    /// Rule for the edge `from -> to`.
    #[must_use]
    pub fn rule(&self, from: &PhaseId, to: &PhaseId) -> Option<&TransitionRule> {
        self.transitions
            .iter()
            .find(|rule| &rule.from == from && &rule.to == to)
    }

    /// Automatic rules leaving `from`, in declaration order.
    pub fn automatic_from<'a>(
        &'a self,
        from: &'a PhaseId,
    ) -> impl Iterator<Item = &'a TransitionRule> + 'a {
        self.transitions
            .iter()
            .filter(move |rule| rule.automatic && &rule.from == from)
    }
}

/// Collects phases, permits, and rules; validates on `build`.
#[derive(Debug)]
pub struct PhaseDefinitionBuilder {
    name: String,
    initial: Option<PhaseId>,
    phases: Vec<(PhaseId, bool)>,
    permits: Vec<(PhaseId, OperationId)>,
    transitions: Vec<TransitionRule>,
}

impl PhaseDefinitionBuilder {
    /// Declares a regular phase.
    #[must_use]
    pub fn phase(mut self, phase: impl Into<PhaseId>) -> Self {
        self.phases.push((phase.into(), false));
        self
    }

    /// Declares a terminal phase.
    #[must_use]
    pub fn terminal(mut self, phase: impl Into<PhaseId>) -> Self {
        self.phases.push((phase.into(), true));
        self
    }

    /// Sets the initial phase.
    #[must_use]
    pub fn initial(mut self, phase: impl Into<PhaseId>) -> Self {
        self.initial = Some(phase.into());
        self
    }

    /// Permits `operation` while in `phase`.
    #[must_use]
    pub fn permit(mut self, phase: impl Into<PhaseId>, operation: OperationId) -> Self {
        self.permits.push((phase.into(), operation));
        self
    }

    /// Adds a transition rule.
    #[must_use]
    pub fn transition(mut self, rule: TransitionRule) -> Self {
        self.transitions.push(rule);
        self
    }

    /// Validates and freezes the definition.
    ///
    /// # Errors
    ///
    /// See [`DefinitionError`].
    pub fn build(self) -> Result<PhaseDefinition, DefinitionError> {
        let mut phases: BTreeMap<PhaseId, PhaseEntry> = BTreeMap::new();
        for (phase, terminal) in self.phases {
            if phases.contains_key(&phase) {
                return Err(DefinitionError::DuplicatePhase(phase));
            }
            phases.insert(
                phase,
                PhaseEntry {
                    terminal,
                    permitted: BTreeSet::new(),
                },
            );
        }

        let initial = self.initial.ok_or(DefinitionError::NoInitialPhase)?;
        if !phases.contains_key(&initial) {
            return Err(DefinitionError::UnknownPhase(initial));
        }

        for (phase, operation) in self.permits {
            let entry = phases
                .get_mut(&phase)
                .ok_or_else(|| DefinitionError::UnknownPhase(phase.clone()))?;
            if entry.terminal {
                return Err(DefinitionError::TerminalNotFinal(phase));
            }
            entry.permitted.insert(operation);
        }

        let mut edges = BTreeSet::new();
        for rule in &self.transitions {
            for phase in [&rule.from, &rule.to] {
                if !phases.contains_key(phase) {
                    return Err(DefinitionError::UnknownPhase(phase.clone()));
                }
            }
            if phases.get(&rule.from).is_some_and(|p| p.terminal) {
                return Err(DefinitionError::TerminalNotFinal(rule.from.clone()));
            }
            if rule.automatic && rule.authorization.is_some() {
                return Err(DefinitionError::AutomaticWithAuthorization {
                    from: rule.from.clone(),
                    to: rule.to.clone(),
                });
            }
            if !edges.insert((rule.from.clone(), rule.to.clone())) {
                return Err(DefinitionError::DuplicateTransition {
                    from: rule.from.clone(),
                    to: rule.to.clone(),
                });
            }
        }

        Ok(PhaseDefinition {
            name: self.name,
            initial,
            phases,
            transitions: self.transitions,
        })
    }
}
