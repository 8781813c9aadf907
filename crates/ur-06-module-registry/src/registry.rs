//! # Module Registry
//!
//! Arena of module descriptors in the `__registry` namespace:
//!
//! ```text
//! count            -> UInt   number of descriptors ever activated
//! descriptor/<i>   -> Bytes  ModuleDescriptor #i (retired ones kept)
//! active           -> UInt   index of the active descriptor
//! ```
//!
//! Resolution goes index -> descriptor -> code, and each hop is validated
//! before it is followed. Loaded code is cached per code reference; the
//! cache is derived and rebuilt from storage through the loader.

use crate::context::ModuleContext;
use crate::domain::{CodeReference, ModuleDescriptor, SchemaIncompatibility};
use crate::errors::RegistryError;
use crate::ports::{Module, ModuleLoader};
use parking_lot::RwLock;
use shared_types::{ChangeNotification, Clock, Component, OperationId, Principal, Tick, U256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use ur_01_storage_facade::{Namespace, SlotValue, StorageFacade};
use ur_03_access_control::{AccessController, TimelockHandle};

const COUNT: &[u8] = b"count";
const ACTIVE: &[u8] = b"active";

fn descriptor_key(index: u64) -> Vec<u8> {
    let mut key = b"descriptor/".to_vec();
    key.extend_from_slice(&index.to_be_bytes());
    key
}

/// The active module, ready to call.
#[derive(Clone)]
pub struct ResolvedModule {
    /// Arena index of the descriptor.
    pub index: u64,
    /// Active descriptor.
    pub descriptor: ModuleDescriptor,
    /// Loaded code.
    pub module: Arc<dyn Module>,
}

impl std::fmt::Debug for ResolvedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedModule")
            .field("index", &self.index)
            .field("module_id", &self.descriptor.module_id)
            .finish_non_exhaustive()
    }
}

/// Tracks the active implementation module and swaps it safely.
pub struct ModuleRegistry {
    access: Arc<AccessController>,
    loader: Arc<dyn ModuleLoader>,
    clock: Arc<dyn Clock>,
    namespace: Namespace,
    app_namespace: Namespace,
    code_cache: RwLock<HashMap<CodeReference, Arc<dyn Module>>>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("app_namespace", &self.app_namespace)
            .field("cached", &self.code_cache.read().len())
            .finish_non_exhaustive()
    }
}

impl ModuleRegistry {
    /// Creates a registry whose modules work in `app_namespace`.
    ///
    /// # Errors
    ///
    /// `ReservedNamespace` if `app_namespace` starts with `__`.
    pub fn new(
        access: Arc<AccessController>,
        loader: Arc<dyn ModuleLoader>,
        clock: Arc<dyn Clock>,
        app_namespace: Namespace,
    ) -> Result<Self, RegistryError> {
        if app_namespace.is_reserved() {
            return Err(RegistryError::ReservedNamespace(app_namespace.to_string()));
        }
        Ok(Self {
            access,
            loader,
            clock,
            namespace: Namespace::reserved("registry"),
            app_namespace,
            code_cache: RwLock::new(HashMap::new()),
        })
    }

    /// Namespace modules read and write.
    #[must_use]
    pub fn app_namespace(&self) -> &Namespace {
        &self.app_namespace
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    fn count(&self, storage: &StorageFacade) -> Result<u64, RegistryError> {
        Ok(storage
            .try_get_typed(&self.namespace, COUNT)?
            .and_then(|v| v.as_uint())
            .map_or(0, |n| n.low_u64()))
    }

    fn descriptor(&self, storage: &StorageFacade, index: u64) -> Result<ModuleDescriptor, RegistryError> {
        storage
            .get_record(&self.namespace, &descriptor_key(index))?
            .ok_or_else(|| RegistryError::Corrupt(format!("descriptor {index} missing")))
    }

    /// Arena index of the active descriptor, if any.
    ///
    /// # Errors
    ///
    /// `Corrupt` if the index points outside the arena, storage failures.
    pub fn active_index(&self, storage: &StorageFacade) -> Result<Option<u64>, RegistryError> {
        let Some(value) = storage.try_get_typed(&self.namespace, ACTIVE)? else {
            return Ok(None);
        };
        let index = value
            .as_uint()
            .ok_or_else(|| RegistryError::Corrupt("active index is not a uint".to_string()))?;
        let count = self.count(storage)?;
        if index >= U256::from(count) {
            return Err(RegistryError::Corrupt(format!(
                "active index {index} outside arena of {count}"
            )));
        }
        Ok(Some(index.low_u64()))
    }

    /// Active descriptor.
    ///
    /// # Errors
    ///
    /// `NoActiveModule`, `Corrupt`, storage failures.
    pub fn current(&self, storage: &StorageFacade) -> Result<ModuleDescriptor, RegistryError> {
        let index = self
            .active_index(storage)?
            .ok_or(RegistryError::NoActiveModule)?;
        self.descriptor(storage, index)
    }

    /// Every descriptor ever activated, oldest first.
    ///
    /// # Errors
    ///
    /// `Corrupt`, storage failures.
    pub fn history(&self, storage: &StorageFacade) -> Result<Vec<ModuleDescriptor>, RegistryError> {
        (0..self.count(storage)?)
            .map(|index| self.descriptor(storage, index))
            .collect()
    }

    /// Active descriptor plus its loaded code.
    ///
    /// # Errors
    ///
    /// `NoActiveModule`, `Corrupt`, `LoadFailed`, storage failures.
    pub fn resolve(&self, storage: &StorageFacade) -> Result<ResolvedModule, RegistryError> {
        let index = self
            .active_index(storage)?
            .ok_or(RegistryError::NoActiveModule)?;
        let descriptor = self.descriptor(storage, index)?;
        if !descriptor.is_active() {
            return Err(RegistryError::Corrupt(format!(
                "descriptor {index} ({}) is not active",
                descriptor.module_id
            )));
        }
        let module = self.load(&descriptor.code_reference)?;
        Ok(ResolvedModule {
            index,
            descriptor,
            module,
        })
    }

    /// Context for a call to the active module.
    #[must_use]
    pub fn context<'a>(
        &'a self,
        storage: &'a mut StorageFacade,
        descriptor: &'a ModuleDescriptor,
        caller: Principal,
    ) -> ModuleContext<'a> {
        ModuleContext::new(storage, &self.app_namespace, &descriptor.schema, caller)
    }

    fn load(&self, reference: &CodeReference) -> Result<Arc<dyn Module>, RegistryError> {
        if let Some(module) = self.code_cache.read().get(reference) {
            return Ok(module.clone());
        }
        let module = self
            .loader
            .load(reference)
            .map_err(|err| RegistryError::LoadFailed {
                reference: reference.clone(),
                reason: err.0,
            })?;
        debug!(%reference, "Module code loaded");
        self.code_cache
            .write()
            .insert(reference.clone(), module.clone());
        Ok(module)
    }

    // =========================================================================
    // ACTIVATION
    // =========================================================================

    /// Activates `descriptor`, retiring the current module.
    ///
    /// # Errors
    ///
    /// `Access` (needs `module.upgrade`), `IncompatibleSchema`,
    /// `DuplicateModule`, `LoadFailed`, storage failures. Nothing is
    /// written on error.
    pub fn activate(
        &self,
        storage: &mut StorageFacade,
        principal: Principal,
        descriptor: ModuleDescriptor,
    ) -> Result<ModuleDescriptor, RegistryError> {
        self.access
            .authorize(storage, principal, &OperationId::UPGRADE)?;
        self.validate(storage, &descriptor)?;
        storage.atomically(|s| self.install(s, descriptor, principal))
    }

    /// Activates `descriptor` by consuming an approved time-lock whose
    /// target is `module.upgrade` and whose payload is the descriptor's
    /// fingerprint. The time-lock is consumed only if the activation
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Everything `activate` returns, plus the time-lock errors of
    /// `execute_timelocked_for`.
    pub fn activate_timelocked(
        &self,
        storage: &mut StorageFacade,
        principal: Principal,
        handle: TimelockHandle,
        descriptor: ModuleDescriptor,
    ) -> Result<ModuleDescriptor, RegistryError> {
        self.validate(storage, &descriptor)?;
        let fingerprint = descriptor.fingerprint();
        storage.atomically(|s| -> Result<_, RegistryError> {
            self.access.execute_timelocked_for(
                s,
                handle,
                principal,
                &OperationId::UPGRADE,
                Some(fingerprint),
            )?;
            self.install(s, descriptor, principal)
        })
    }

    /// Checks a candidate without writing: schema hash, uniqueness,
    /// compatibility with the active schema, and that its code loads.
    ///
    /// # Errors
    ///
    /// `IncompatibleSchema`, `DuplicateModule`, `LoadFailed`, storage failures.
    pub fn validate(
        &self,
        storage: &StorageFacade,
        descriptor: &ModuleDescriptor,
    ) -> Result<(), RegistryError> {
        let incompatible = |reason| RegistryError::IncompatibleSchema {
            module: descriptor.module_id.clone(),
            reason,
        };

        let computed = descriptor.schema.hash();
        if computed != descriptor.storage_schema_hash {
            warn!(module = %descriptor.module_id, "Schema hash mismatch");
            return Err(incompatible(SchemaIncompatibility::HashMismatch {
                declared: descriptor.storage_schema_hash,
                computed,
            }));
        }

        let history = self.history(storage)?;
        if history
            .iter()
            .any(|existing| existing.module_id == descriptor.module_id)
        {
            return Err(RegistryError::DuplicateModule(descriptor.module_id.clone()));
        }

        if let Some(index) = self.active_index(storage)? {
            let active = self.descriptor(storage, index)?;
            if let Err(reason) = descriptor.schema.check_replaces(&active.schema) {
                warn!(
                    module = %descriptor.module_id,
                    active = %active.module_id,
                    %reason,
                    "Incompatible schema rejected"
                );
                return Err(incompatible(reason));
            }
        }

        self.load(&descriptor.code_reference)?;
        Ok(())
    }

    fn install(
        &self,
        storage: &mut StorageFacade,
        mut descriptor: ModuleDescriptor,
        principal: Principal,
    ) -> Result<ModuleDescriptor, RegistryError> {
        let now: Tick = self.clock.now();
        let index = self.count(storage)?;

        let previous = match self.active_index(storage)? {
            Some(prev_index) => {
                let mut prev = self.descriptor(storage, prev_index)?;
                prev.retired_at = Some(now);
                storage.put_record(&self.namespace, &descriptor_key(prev_index), &prev)?;
                Some(prev.module_id)
            }
            None => None,
        };

        descriptor.activated_at = Some(now);
        descriptor.retired_at = None;
        storage.put_record(&self.namespace, &descriptor_key(index), &descriptor)?;
        storage.set_typed(
            &self.namespace,
            COUNT,
            &SlotValue::UInt(U256::from(index + 1)),
        )?;
        storage.set_typed(&self.namespace, ACTIVE, &SlotValue::UInt(U256::from(index)))?;

        storage.publish(ChangeNotification::fields(
            Component::ModuleRegistry,
            "module_activated",
            [
                ("module_id", descriptor.module_id.to_string()),
                ("code_reference", descriptor.code_reference.to_string()),
                (
                    "storage_schema_hash",
                    format!("{:?}", descriptor.storage_schema_hash),
                ),
                ("index", index.to_string()),
                (
                    "previous",
                    previous
                        .as_ref()
                        .map_or_else(|| "-".to_string(), ToString::to_string),
                ),
                ("by", format!("{principal:?}")),
            ],
        ));
        info!(
            module = %descriptor.module_id,
            index,
            previous = ?previous,
            at = %now,
            "Module activated"
        );
        Ok(descriptor)
    }
}

// =============================================================================
// TESTS
// =============================================================================
