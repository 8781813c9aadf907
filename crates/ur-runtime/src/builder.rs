//! # Runtime Builder
//!
//! Wires the components in dependency order and bootstraps fresh state:
//!
//! 1. Validate configuration, register metrics
//! 2. Storage facade over the chosen slot store and change sink
//! 3. Access controller, emergency stop, dispatch guard
//! 4. Module registry, optional phase machine, oracles
//! 5. One transaction: owner, phase initial state, operation policies,
//!    genesis module

use crate::adapters::TracingSink;
use crate::config::{ConfigError, RuntimeConfig};
use crate::errors::RuntimeError;
use crate::runtime::Runtime;
use parking_lot::RwLock;
use shared_types::{ChangeSink, Clock, EntropySource, OperationId, Principal, SystemClock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use ur_01_storage_facade::{InMemorySlotStore, Namespace, SlotStore, StorageFacade};
use ur_02_dispatch_guard::DispatchGuard;
use ur_03_access_control::{AccessController, EmergencyStop, OperationPolicy};
use ur_04_phase_machine::{PhaseDefinition, PhaseMachine};
use ur_05_commit_reveal::{CommitRevealOracle, OracleConfig};
use ur_06_module_registry::{ModuleDescriptor, ModuleLoader, ModuleRegistry, StaticModuleLoader};
use ur_telemetry::register_metrics;

struct OracleEntry {
    name: String,
    config: Option<OracleConfig>,
    phased: bool,
}

/// Assembles a [`Runtime`].
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    clock: Option<Arc<dyn Clock>>,
    entropy: Option<Arc<dyn EntropySource>>,
    sink: Option<Arc<dyn ChangeSink>>,
    store: Option<Arc<dyn SlotStore>>,
    loader: Arc<dyn ModuleLoader>,
    phases: Option<PhaseDefinition>,
    oracles: Vec<OracleEntry>,
    operations: Vec<(OperationId, OperationPolicy)>,
    genesis_module: Option<ModuleDescriptor>,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl RuntimeBuilder {
    /// Starts from `config`.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            clock: None,
            entropy: None,
            sink: None,
            store: None,
            loader: Arc::new(StaticModuleLoader::new()),
            phases: None,
            oracles: Vec::new(),
            operations: Vec::new(),
            genesis_module: None,
        }
    }

    /// Time source (default: wall-clock seconds).
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Entropy for commit-reveal oracles. Required if any oracle is added.
    #[must_use]
    pub fn entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = Some(entropy);
        self
    }

    /// Change sink (default: [`TracingSink`]).
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn ChangeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Slot store backend (default: in-memory).
    #[must_use]
    pub fn store(mut self, store: Arc<dyn SlotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Resolves module code references.
    #[must_use]
    pub fn loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Lifecycle applied to every dispatched call.
    #[must_use]
    pub fn phases(mut self, definition: PhaseDefinition) -> Self {
        self.phases = Some(definition);
        self
    }

    /// Adds a commit-reveal oracle using the configured oracle defaults.
    #[must_use]
    pub fn oracle(mut self, name: impl Into<String>) -> Self {
        self.oracles.push(OracleEntry {
            name: name.into(),
            config: None,
            phased: false,
        });
        self
    }

    /// Adds an oracle whose commits and reveals are gated by the phase
    /// machine (`<name>.commit`, `<name>.reveal` permits).
    #[must_use]
    pub fn phased_oracle(mut self, name: impl Into<String>, config: Option<OracleConfig>) -> Self {
        self.oracles.push(OracleEntry {
            name: name.into(),
            config,
            phased: true,
        });
        self
    }

    /// Policy registered at bootstrap.
    #[must_use]
    pub fn operation(mut self, operation: OperationId, policy: OperationPolicy) -> Self {
        self.operations.push((operation, policy));
        self
    }

    /// Module activated at bootstrap by the owner.
    #[must_use]
    pub fn genesis_module(mut self, descriptor: ModuleDescriptor) -> Self {
        self.genesis_module = Some(descriptor);
        self
    }

    /// Builds the runtime over fresh state owned by `owner`.
    ///
    /// # Errors
    ///
    /// `Config`, `Telemetry`, `NoPhaseMachine` for a phased oracle without
    /// phases, `Oracle(InvalidConfig)`, and any bootstrap failure (the
    /// store is left untouched in that case).
    pub fn build(self, owner: Principal) -> Result<Runtime, RuntimeError> {
        self.config.validate()?;
        register_metrics()?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemorySlotStore::new()));
        let mut storage = StorageFacade::new(store, sink);

        let access = Arc::new(AccessController::new(
            self.config.access.clone(),
            clock.clone(),
        ));
        let registry = ModuleRegistry::new(
            access.clone(),
            self.loader,
            clock.clone(),
            Namespace::new(self.config.app_namespace.clone()),
        )?;
        let phases = self
            .phases
            .map(|definition| Arc::new(PhaseMachine::new(definition, access.clone(), clock.clone())));

        let mut oracles = BTreeMap::new();
        if !self.oracles.is_empty() {
            let entropy = self.entropy.ok_or(ConfigError::MissingEntropy)?;
            for entry in self.oracles {
                let config = entry.config.unwrap_or_else(|| self.config.oracle.clone());
                let mut oracle = CommitRevealOracle::new(
                    entry.name.clone(),
                    config,
                    access.clone(),
                    entropy.clone(),
                    clock.clone(),
                )?;
                if entry.phased {
                    let machine = phases.clone().ok_or(RuntimeError::NoPhaseMachine)?;
                    oracle = oracle
                        .with_commit_phase(machine.clone())
                        .with_reveal_phase(machine);
                }
                oracles.insert(entry.name, oracle);
            }
        }

        let operations = self.operations;
        let genesis_module = self.genesis_module;
        storage.atomically(|s| -> Result<(), RuntimeError> {
            access.initialize(s, owner)?;
            if let Some(machine) = &phases {
                machine.initialize(s)?;
            }
            for (operation, policy) in operations {
                access.register_operation(s, owner, &operation, policy)?;
            }
            if let Some(descriptor) = genesis_module {
                registry.activate(s, owner, descriptor)?;
            }
            Ok(())
        })?;

        info!(
            app_namespace = %self.config.app_namespace,
            %owner,
            phases = phases.is_some(),
            oracles = oracles.len(),
            "Runtime bootstrapped"
        );

        Ok(Runtime {
            emergency: EmergencyStop::new(access.clone()),
            guard: DispatchGuard::new(),
            config: self.config,
            storage: RwLock::new(storage),
            clock,
            access,
            registry,
            phases,
            oracles,
        })
    }
}
