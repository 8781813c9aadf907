//! # Shared Fixtures
//!
//! A small vault application in three versions:
//!
//! | Version | Schema | Behavior |
//! |---------|--------|----------|
//! | v1 | `total: UInt` | deposit, withdraw (with optional callback), balance |
//! | v2 | adds `last_depositor: Address` | v1 plus depositor tracking |
//! | v3 | `total: Int` | retypes `total`; must never activate over v1/v2 |
//!
//! `vault.withdraw` pays out through a callback *before* updating the total,
//! which is the classic reentrancy shape. `attacker.reenter` is the hostile
//! callback: it calls `vault.withdraw` again.

use shared_types::{ManualClock, OperationId, Principal, SeededEntropy, Tick, U256};
use std::sync::Arc;
use ur_01_storage_facade::{Namespace, SlotValue, TypeTag};
use ur_03_access_control::OperationPolicy;
use ur_06_module_registry::{
    Module, ModuleCall, ModuleContext, ModuleDescriptor, ModuleError, StaticModuleLoader,
    StorageSchema,
};
use ur_runtime::{MemorySink, Runtime, RuntimeBuilder};

pub const DEPOSIT: OperationId = OperationId::from_static("vault.deposit");
pub const WITHDRAW: OperationId = OperationId::from_static("vault.withdraw");
pub const BALANCE: OperationId = OperationId::from_static("vault.balance");
pub const NOTIFY: OperationId = OperationId::from_static("vault.notify");
pub const REENTER: OperationId = OperationId::from_static("attacker.reenter");

/// Oracle registered by [`harness`].
pub const LOTTERY: &str = "lottery";

/// Big-endian amount payload.
pub fn amount(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Withdraw payload that pays out through `callback` first.
pub fn withdraw_via(value: u64, callback: &OperationId) -> Vec<u8> {
    let mut payload = amount(value);
    payload.extend_from_slice(callback.as_str().as_bytes());
    payload
}

fn decode_amount(payload: &[u8]) -> Result<(u64, &[u8]), ModuleError> {
    if payload.len() < 8 {
        return Err(ModuleError::InvalidInput(format!(
            "expected an 8-byte amount, got {} bytes",
            payload.len()
        )));
    }
    let (head, rest) = payload.split_at(8);
    let mut buf = [0u8; 8];
    buf.copy_from_slice(head);
    Ok((u64::from_be_bytes(buf), rest))
}

/// Vault implementation. `track_depositor` is the v2 behavior.
pub struct Vault {
    pub track_depositor: bool,
}

impl Vault {
    fn total(ctx: &ModuleContext<'_>) -> Result<U256, ModuleError> {
        Ok(ctx
            .get("total")?
            .and_then(|v| v.as_uint())
            .unwrap_or_default())
    }
}

impl Module for Vault {
    fn call(&self, ctx: &mut ModuleContext<'_>, call: &ModuleCall) -> Result<Vec<u8>, ModuleError> {
        match call.operation.as_str() {
            "vault.deposit" => {
                let (value, _) = decode_amount(&call.payload)?;
                let next = Self::total(ctx)? + U256::from(value);
                ctx.set("total", SlotValue::UInt(next))?;
                if self.track_depositor {
                    ctx.set("last_depositor", SlotValue::Address(call.caller))?;
                }
                Ok(amount(next.low_u64()))
            }
            "vault.withdraw" => {
                let (value, callback) = decode_amount(&call.payload)?;
                let current = Self::total(ctx)?;
                if current < U256::from(value) {
                    return Err(ModuleError::Failed("insufficient funds".into()));
                }
                if !callback.is_empty() {
                    let target = String::from_utf8(callback.to_vec())
                        .map_err(|e| ModuleError::InvalidInput(e.to_string()))?;
                    ctx.forward(ModuleCall::new(
                        OperationId::new(target),
                        call.caller,
                        amount(value),
                    ))?;
                }
                let next = Self::total(ctx)? - U256::from(value);
                ctx.set("total", SlotValue::UInt(next))?;
                Ok(amount(next.low_u64()))
            }
            "vault.balance" => Ok(amount(Self::total(ctx)?.low_u64())),
            "vault.notify" => Ok(Vec::new()),
            "attacker.reenter" => ctx.forward(ModuleCall::new(
                WITHDRAW,
                call.caller,
                call.payload.clone(),
            )),
            _ => Err(ModuleError::UnsupportedOperation(call.operation.clone())),
        }
    }
}

/// v3 code; it never gets to run because its schema is rejected.
pub struct SignedVault;

impl Module for SignedVault {
    fn call(&self, _ctx: &mut ModuleContext<'_>, call: &ModuleCall) -> Result<Vec<u8>, ModuleError> {
        Err(ModuleError::UnsupportedOperation(call.operation.clone()))
    }
}

pub fn v1_schema() -> StorageSchema {
    StorageSchema::new().with("total", TypeTag::UInt)
}

pub fn vault_v1() -> ModuleDescriptor {
    ModuleDescriptor::new("vault-v1", "code://vault-v1", v1_schema())
}

pub fn vault_v2() -> ModuleDescriptor {
    ModuleDescriptor::new(
        "vault-v2",
        "code://vault-v2",
        v1_schema().with("last_depositor", TypeTag::Address),
    )
}

pub fn vault_v3() -> ModuleDescriptor {
    ModuleDescriptor::new(
        "vault-v3",
        "code://vault-v3",
        StorageSchema::new()
            .with("total", TypeTag::Int)
            .with("last_depositor", TypeTag::Address),
    )
}

pub fn vault_loader() -> StaticModuleLoader {
    StaticModuleLoader::new()
        .with_module(
            "code://vault-v1",
            Arc::new(Vault {
                track_depositor: false,
            }),
        )
        .with_module(
            "code://vault-v2",
            Arc::new(Vault {
                track_depositor: true,
            }),
        )
        .with_module("code://vault-v3", Arc::new(SignedVault))
}

/// A bootstrapped runtime plus handles on its test adapters.
pub struct Harness {
    pub runtime: Runtime,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<MemorySink>,
    pub owner: Principal,
    pub user: Principal,
}

impl Harness {
    /// `total` as stored, read outside the pipeline.
    pub fn total(&self) -> Option<SlotValue> {
        let namespace = Namespace::new(self.runtime.config().app_namespace.clone());
        self.runtime
            .query(|s| s.try_get_typed(&namespace, b"total"))
            .ok()
            .flatten()
    }

    pub fn deposit(&self, caller: Principal, value: u64) -> u64 {
        let out = self
            .runtime
            .invoke(caller, DEPOSIT, amount(value))
            .expect("deposit");
        let (total, _) = decode_amount(&out).expect("amount");
        total
    }
}

/// Vault v1 at genesis, every vault operation public, one oracle.
pub fn harness() -> Harness {
    harness_with(RuntimeBuilder::default())
}

/// Like [`harness`] on top of a caller-prepared builder.
pub fn harness_with(builder: RuntimeBuilder) -> Harness {
    let clock = Arc::new(ManualClock::new(Tick(0)));
    let sink = Arc::new(MemorySink::new());
    let owner = Principal::from_label("owner");
    let user = Principal::from_label("user");
    let mut builder = builder
        .clock(clock.clone())
        .sink(sink.clone())
        .entropy(Arc::new(SeededEntropy::new(b"ur-tests".to_vec())))
        .loader(Arc::new(vault_loader()))
        .oracle(LOTTERY)
        .genesis_module(vault_v1());
    for op in [DEPOSIT, WITHDRAW, BALANCE, NOTIFY, REENTER] {
        builder = builder.operation(op, OperationPolicy::public());
    }
    let runtime = builder.build(owner).expect("bootstrap");
    Harness {
        runtime,
        clock,
        sink,
        owner,
        user,
    }
}
