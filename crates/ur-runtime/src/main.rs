//! # ur-node
//!
//! Demo host for the runtime: boots a counter module, calls it, upgrades it
//! to a schema-compatible second version, and prints the metrics.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (`UR_CONFIG` JSON file if set, then env overrides)
//! 2. Initialize telemetry
//! 3. Build the runtime with the counter module as genesis
//! 4. Exercise dispatch and an upgrade

use std::sync::Arc;

use anyhow::{Context, Result};
use shared_types::{OperationId, Principal, U256};
use tracing::info;
use ur_01_storage_facade::{SlotValue, TypeTag};
use ur_03_access_control::OperationPolicy;
use ur_06_module_registry::{
    Module, ModuleCall, ModuleContext, ModuleDescriptor, ModuleError, StaticModuleLoader,
    StorageSchema,
};
use ur_runtime::{RuntimeBuilder, RuntimeConfig};

const INCREMENT: OperationId = OperationId::from_static("counter.increment");

/// Adds `step` to `count` and records the last caller in v2.
struct Counter {
    step: u64,
    track_caller: bool,
}

impl Module for Counter {
    fn call(&self, ctx: &mut ModuleContext<'_>, call: &ModuleCall) -> Result<Vec<u8>, ModuleError> {
        if call.operation != INCREMENT {
            return Err(ModuleError::UnsupportedOperation(call.operation.clone()));
        }
        let current = ctx
            .get("count")?
            .and_then(|v| v.as_uint())
            .unwrap_or_default();
        let next = current + U256::from(self.step);
        ctx.set("count", SlotValue::UInt(next))?;
        if self.track_caller {
            ctx.set("last_caller", SlotValue::Address(ctx.caller()))?;
        }
        Ok(next.low_u64().to_be_bytes().to_vec())
    }
}

fn load_config() -> Result<RuntimeConfig> {
    match std::env::var("UR_CONFIG") {
        Ok(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading configuration {path}"))?;
            let config = RuntimeConfig::from_json_str(&text)?;
            Ok(config.with_env_overrides()?)
        }
        Err(_) => Ok(RuntimeConfig::from_env()?),
    }
}

fn main() -> Result<()> {
    let config = load_config()?;
    ur_telemetry::init_telemetry(&config.telemetry).context("initializing telemetry")?;

    let v1_schema = StorageSchema::new().with("count", TypeTag::UInt);
    let v2_schema = v1_schema.clone().with("last_caller", TypeTag::Address);
    let loader = StaticModuleLoader::new()
        .with_module(
            "builtin://counter-v1",
            Arc::new(Counter {
                step: 1,
                track_caller: false,
            }),
        )
        .with_module(
            "builtin://counter-v2",
            Arc::new(Counter {
                step: 10,
                track_caller: true,
            }),
        );

    let owner = Principal::from_label("owner");
    let user = Principal::from_label("user");
    let runtime = RuntimeBuilder::new(config)
        .loader(Arc::new(loader))
        .operation(INCREMENT, OperationPolicy::public())
        .genesis_module(ModuleDescriptor::new(
            "counter-v1",
            "builtin://counter-v1",
            v1_schema,
        ))
        .build(owner)
        .context("bootstrapping runtime")?;

    runtime.invoke(user, INCREMENT, Vec::new())?;
    runtime.activate_module(
        owner,
        ModuleDescriptor::new("counter-v2", "builtin://counter-v2", v2_schema),
    )?;
    let output = runtime.invoke(user, INCREMENT, Vec::new())?;
    info!(
        module = %runtime.current_module()?.module_id,
        count = u64::from_be_bytes(output.as_slice().try_into().unwrap_or_default()),
        "Counter upgraded without losing state"
    );

    println!("{}", ur_telemetry::gather_metrics()?);
    Ok(())
}
