//! # Module Context
//!
//! The only view a module gets of persistent state: the application
//! namespace, restricted to the keys its schema declares, at the types it
//! declares. Reserved runtime namespaces are unreachable from here.

use crate::domain::StorageSchema;
use crate::errors::ModuleError;
use crate::ports::{CallForwarder, ModuleCall};
use shared_types::Principal;
use ur_01_storage_facade::{Namespace, SlotValue, StorageFacade, TypeTag};

/// Schema-checked storage access for one module call.
pub struct ModuleContext<'a> {
    storage: &'a mut StorageFacade,
    namespace: &'a Namespace,
    schema: &'a StorageSchema,
    caller: Principal,
    forwarder: Option<&'a dyn CallForwarder>,
}

impl<'a> ModuleContext<'a> {
    /// Creates a context over `namespace` governed by `schema`.
    #[must_use]
    pub fn new(
        storage: &'a mut StorageFacade,
        namespace: &'a Namespace,
        schema: &'a StorageSchema,
        caller: Principal,
    ) -> Self {
        Self {
            storage,
            namespace,
            schema,
            caller,
            forwarder: None,
        }
    }

    /// Enables [`ModuleContext::forward`].
    #[must_use]
    pub fn with_forwarder(mut self, forwarder: &'a dyn CallForwarder) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    /// Authenticated caller of the current call.
    #[must_use]
    pub fn caller(&self) -> Principal {
        self.caller
    }

    /// The schema in force.
    #[must_use]
    pub fn schema(&self) -> &StorageSchema {
        self.schema
    }

    fn declared(&self, key: &str) -> Result<TypeTag, ModuleError> {
        self.schema
            .get(key)
            .ok_or_else(|| ModuleError::UndeclaredKey(key.to_string()))
    }

    /// Value of `key`, or None if unset.
    ///
    /// # Errors
    ///
    /// `UndeclaredKey`, storage failures.
    pub fn get(&self, key: &str) -> Result<Option<SlotValue>, ModuleError> {
        self.declared(key)?;
        Ok(self.storage.try_get_typed(self.namespace, key.as_bytes())?)
    }

    /// Writes `value` to `key`.
    ///
    /// # Errors
    ///
    /// `UndeclaredKey`, `TypeMismatch` against the schema, storage failures
    /// (including the facade's own sticky-type check).
    pub fn set(&mut self, key: &str, value: SlotValue) -> Result<(), ModuleError> {
        let declared = self.declared(key)?;
        let actual = value.type_tag();
        if declared != actual {
            return Err(ModuleError::TypeMismatch {
                key: key.to_string(),
                declared,
                actual,
            });
        }
        Ok(self.storage.set_typed(self.namespace, key.as_bytes(), &value)?)
    }

    /// Deletes `key`.
    ///
    /// # Errors
    ///
    /// `UndeclaredKey`, `NotFound` (as a storage error), storage failures.
    pub fn delete(&mut self, key: &str) -> Result<(), ModuleError> {
        self.declared(key)?;
        Ok(self.storage.delete(self.namespace, key.as_bytes())?)
    }

    /// Dispatches a nested call through the full pipeline (authorization,
    /// phase, reentrancy guard).
    ///
    /// # Errors
    ///
    /// `ForwardingUnavailable`, or whatever the forwarder returns.
    pub fn forward(&mut self, call: ModuleCall) -> Result<Vec<u8>, ModuleError> {
        let forwarder = self.forwarder.ok_or(ModuleError::ForwardingUnavailable)?;
        forwarder.forward(&mut *self.storage, call)
    }
}
