//! Plugin instantiation and the typed `manifest`/`check` calls: fuel
//! metering, epoch-interrupt wall-clock budgets, and a host-function
//! linker registered under one configurable import module name.

use crate::config::RuntimeConfig;
use crate::dispatch::{self, HandlerContext};
use crate::error::RuntimeError;
use reglet_abi::{check_size, pack, read_bytes, unpack, AbiError};
use reglet_policy::PolicyEngine;
use reglet_types::{ContextEnvelope, GrantSet, Manifest, Outcome};
use std::sync::Arc;
use std::time::Duration;
use wasmtime::{Engine, Linker, Memory, Module, Store, TypedFunc};

/// Wraps a compiled module plus a fuel/epoch-aware `wasmtime::Engine`.
/// Cheap to clone: `Engine` and `Module` are both internally `Arc`-backed.
pub struct PluginModule {
    engine: Engine,
    module: Module,
    config: RuntimeConfig,
}

impl PluginModule {
    pub fn compile(wasm_bytes: &[u8], config: RuntimeConfig) -> Result<Self, RuntimeError> {
        let mut engine_config = wasmtime::Config::new();
        engine_config.consume_fuel(config.fuel_limit > 0);
        engine_config.epoch_interruption(true);
        let engine =
            Engine::new(&engine_config).map_err(|e| RuntimeError::Compilation(e.to_string()))?;
        let module = Module::new(&engine, wasm_bytes)
            .map_err(|e| RuntimeError::Compilation(e.to_string()))?;
        Ok(Self {
            engine,
            module,
            config,
        })
    }

    /// Instantiate a fresh instance bound to one policy engine / grant set
    /// / context. A new instance is created per `check` call so plugin
    /// state never leaks between invocations.
    pub fn instantiate(
        &self,
        engine: Arc<PolicyEngine>,
        grants: GrantSet,
        context: ContextEnvelope,
        handle: tokio::runtime::Handle,
    ) -> Result<PluginInstance, RuntimeError> {
        let mut store = Store::new(
            &self.engine,
            HostState {
                engine,
                grants,
                context,
                handle,
            },
        );
        if self.config.fuel_limit > 0 {
            store
                .set_fuel(self.config.fuel_limit)
                .map_err(|e| RuntimeError::Instantiation(e.to_string()))?;
        }
        store.set_epoch_deadline(1);

        let engine_clone = self.engine.clone();
        let timeout_secs = self.config.timeout_secs;
        let watchdog = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(timeout_secs));
            engine_clone.increment_epoch();
        });

        let mut linker = Linker::new(&self.engine);
        register_host_functions(&mut linker, &self.config)
            .map_err(|e| RuntimeError::Instantiation(e.to_string()))?;

        let instance = linker
            .instantiate(&mut store, &self.module)
            .map_err(|e| RuntimeError::Instantiation(e.to_string()))?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| RuntimeError::Abi("module does not export memory".to_string()))?;
        let alloc = instance
            .get_typed_func::<i32, i32>(&mut store, "allocate")
            .map_err(|_| RuntimeError::Abi("module does not export allocate".to_string()))?;
        let manifest_fn = instance
            .get_typed_func::<(), i64>(&mut store, "manifest")
            .ok();
        let observe_fn = instance
            .get_typed_func::<(i32, i32), i64>(&mut store, "observe")
            .map_err(|_| RuntimeError::Abi("module does not export observe".to_string()))?;
        let schema_fn = instance.get_typed_func::<(), i64>(&mut store, "schema").ok();

        Ok(PluginInstance {
            store,
            memory,
            alloc,
            manifest_fn,
            observe_fn,
            schema_fn,
            max_request_bytes: self.config.max_request_bytes,
            _watchdog: watchdog,
        })
    }
}

/// Host-side state stored in the `wasmtime::Store`, reachable from every
/// registered host function's closure.
struct HostState {
    engine: Arc<PolicyEngine>,
    grants: GrantSet,
    context: ContextEnvelope,
    handle: tokio::runtime::Handle,
}

fn register_host_functions(
    linker: &mut Linker<HostState>,
    config: &RuntimeConfig,
) -> Result<(), wasmtime::Error> {
    for name in ["dns_resolve", "http_request", "tcp_connect", "smtp_send", "exec_run"] {
        let call_name = name.to_string();
        linker.func_wrap(
            config.host_module_name.as_str(),
            name,
            move |mut caller: wasmtime::Caller<'_, HostState>, packed: i64| -> i64 {
                let (ptr, len) = unpack(packed);
                let memory = match caller.get_export("memory").and_then(|e| e.into_memory()) {
                    Some(m) => m,
                    None => return 0,
                };
                let payload = match read_bytes(memory.data(&caller), ptr, len) {
                    Ok(bytes) => bytes.to_vec(),
                    Err(_) => return 0,
                };

                let (policy_engine, grants, context, handle) = {
                    let state = caller.data();
                    (
                        state.engine.clone(),
                        state.grants.clone(),
                        state.context.clone(),
                        state.handle.clone(),
                    )
                };
                let ctx = HandlerContext {
                    engine: &policy_engine,
                    grants: &grants,
                    context: &context,
                    handle: &handle,
                };
                let response = match dispatch::dispatch(&call_name, &payload, &ctx) {
                    Ok(bytes) => bytes,
                    Err(_) => return 0,
                };

                let alloc = match caller.get_export("allocate").and_then(|e| e.into_func()) {
                    Some(f) => f,
                    None => return 0,
                };
                let typed = match alloc.typed::<i32, i32>(&caller) {
                    Ok(f) => f,
                    Err(_) => return 0,
                };
                let out_ptr = match typed.call(&mut caller, response.len() as i32) {
                    Ok(p) => p as u32,
                    Err(_) => return 0,
                };
                let memory = match caller.get_export("memory").and_then(|e| e.into_memory()) {
                    Some(m) => m,
                    None => return 0,
                };
                if memory
                    .write(&mut caller, out_ptr as usize, &response)
                    .is_err()
                {
                    return 0;
                }
                pack(out_ptr, response.len() as u32)
            },
        )?;
    }

    linker.func_wrap(
        config.host_module_name.as_str(),
        "log_message",
        |mut caller: wasmtime::Caller<'_, HostState>, packed: i64| {
            let (ptr, len) = unpack(packed);
            if let Some(memory) = caller.get_export("memory").and_then(|e| e.into_memory()) {
                if let Ok(bytes) = read_bytes(memory.data(&caller), ptr, len) {
                    if let Ok(message) = std::str::from_utf8(bytes) {
                        tracing::info!(target: "reglet::guest", "{message}");
                    }
                }
            }
            let _ = &mut caller;
        },
    )?;

    Ok(())
}

/// A live, instantiated plugin bound to one `check` call's policy/context.
pub struct PluginInstance {
    store: Store<HostState>,
    memory: Memory,
    alloc: TypedFunc<i32, i32>,
    manifest_fn: Option<TypedFunc<(), i64>>,
    observe_fn: TypedFunc<(i32, i32), i64>,
    schema_fn: Option<TypedFunc<(), i64>>,
    max_request_bytes: usize,
    _watchdog: std::thread::JoinHandle<()>,
}

impl PluginInstance {
    pub fn manifest(&mut self) -> Result<Manifest, RuntimeError> {
        let manifest_fn = self
            .manifest_fn
            .ok_or_else(|| RuntimeError::Abi("module does not export manifest".to_string()))?;
        let packed = manifest_fn.call(&mut self.store, ()).map_err(map_trap)?;
        let bytes = self.read_packed(packed)?;
        serde_json::from_slice(bytes).map_err(|e| RuntimeError::Abi(e.to_string()))
    }

    /// Fetch the optional `schema` export's raw bytes (a JSON schema
    /// blob for the plugin's config shape). Returns `None` if the guest
    /// doesn't export `schema`.
    pub fn schema(&mut self) -> Result<Option<Vec<u8>>, RuntimeError> {
        let Some(schema_fn) = self.schema_fn else {
            return Ok(None);
        };
        let packed = schema_fn.call(&mut self.store, ()).map_err(map_trap)?;
        if packed == 0 {
            return Ok(None);
        }
        Ok(Some(self.read_packed(packed)?.to_vec()))
    }

    pub fn check(&mut self, request_json: &[u8]) -> Result<Outcome, RuntimeError> {
        check_size(request_json.len(), self.max_request_bytes)
            .map_err(|e| RuntimeError::Abi(e.to_string()))?;

        let in_ptr = self
            .alloc
            .call(&mut self.store, request_json.len() as i32)
            .map_err(map_trap)? as u32;
        self.memory
            .write(&mut self.store, in_ptr as usize, request_json)
            .map_err(|e| RuntimeError::Abi(e.to_string()))?;

        let observe_fn = self.observe_fn;
        let packed = observe_fn
            .call(&mut self.store, (in_ptr as i32, request_json.len() as i32))
            .map_err(map_trap)?;

        let bytes = self.read_packed(packed)?;
        serde_json::from_slice(bytes).map_err(|e| RuntimeError::Abi(e.to_string()))
    }

    fn read_packed(&self, packed: i64) -> Result<&[u8], RuntimeError> {
        if packed == 0 {
            return Err(RuntimeError::Execution(
                AbiError::AbsentResponse.to_string(),
            ));
        }
        let (ptr, len) = unpack(packed);
        read_bytes(self.memory.data(&self.store), ptr, len)
            .map_err(|e| RuntimeError::Abi(e.to_string()))
    }
}

fn map_trap(err: wasmtime::Error) -> RuntimeError {
    if let Some(trap) = err.downcast_ref::<wasmtime::Trap>() {
        return match trap {
            wasmtime::Trap::OutOfFuel => RuntimeError::FuelExhausted,
            wasmtime::Trap::Interrupt => RuntimeError::Timeout(0),
            other => RuntimeError::Execution(other.to_string()),
        };
    }
    RuntimeError::Execution(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reglet_policy::{NullDenialHandler, PolicyEngine, PolicyEngineConfig};

    // Echoes the `(ptr, len)` it's handed straight back as its packed
    // result, so `observe`'s input bytes equal its output bytes.
    const ECHO_WAT: &str = r#"
        (module
            (memory (export "memory") 1)
            (global $bump (mut i32) (i32.const 1024))

            (func (export "allocate") (param $size i32) (result i32)
                (local $ptr i32)
                (local.set $ptr (global.get $bump))
                (global.set $bump (i32.add (global.get $bump) (local.get $size)))
                (local.get $ptr)
            )

            (func (export "observe") (param $ptr i32) (param $len i32) (result i64)
                (i64.or
                    (i64.shl (i64.extend_i32_u (local.get $ptr)) (i64.const 32))
                    (i64.extend_i32_u (local.get $len))
                )
            )
        )
    "#;

    const INFINITE_LOOP_WAT: &str = r#"
        (module
            (memory (export "memory") 1)
            (global $bump (mut i32) (i32.const 1024))

            (func (export "allocate") (param $size i32) (result i32)
                (local $ptr i32)
                (local.set $ptr (global.get $bump))
                (global.set $bump (i32.add (global.get $bump) (local.get $size)))
                (local.get $ptr)
            )

            (func (export "observe") (param $ptr i32) (param $len i32) (result i64)
                (loop $inf (br $inf))
                (i64.const 0)
            )
        )
    "#;

    fn test_policy_engine() -> Arc<PolicyEngine> {
        Arc::new(PolicyEngine::new(PolicyEngineConfig {
            cwd: None,
            resolve_symlinks: false,
            denial_handler: Arc::new(NullDenialHandler),
        }))
    }

    #[tokio::test]
    async fn echo_module_returns_its_input_unchanged() {
        let module = PluginModule::compile(ECHO_WAT.as_bytes(), RuntimeConfig::default()).unwrap();
        let handle = tokio::runtime::Handle::current();
        let mut instance = module
            .instantiate(
                test_policy_engine(),
                GrantSet::default(),
                ContextEnvelope::default(),
                handle,
            )
            .unwrap();

        let outcome = instance.check(b"{\"hello\":\"world\"}");
        // The echo module returns its raw input bytes, which aren't a
        // valid `Outcome` — this exercises the ABI decode path, not a
        // real plugin's semantics.
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn infinite_loop_module_exhausts_its_fuel_budget() {
        let config = RuntimeConfig {
            fuel_limit: 10_000,
            ..RuntimeConfig::default()
        };
        let module = PluginModule::compile(INFINITE_LOOP_WAT.as_bytes(), config).unwrap();
        let handle = tokio::runtime::Handle::current();
        let mut instance = module
            .instantiate(
                test_policy_engine(),
                GrantSet::default(),
                ContextEnvelope::default(),
                handle,
            )
            .unwrap();

        let err = instance.check(b"{}").unwrap_err();
        assert!(matches!(err, RuntimeError::FuelExhausted));
    }
}
