//! The public, async entry point: compiles once, instantiates and runs
//! `check` per call on a blocking thread, since `wasmtime::Store` is not
//! `Send` across an `.await` point.

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::instance::PluginModule;
use reglet_policy::PolicyEngine;
use reglet_types::{ContextEnvelope, GrantSet, Manifest, Outcome};
use std::sync::Arc;

pub struct Executor {
    module: Arc<PluginModule>,
}

impl Executor {
    pub fn compile(wasm_bytes: &[u8], config: RuntimeConfig) -> Result<Self, RuntimeError> {
        Ok(Self {
            module: Arc::new(PluginModule::compile(wasm_bytes, config)?),
        })
    }

    pub async fn manifest(&self, engine: Arc<PolicyEngine>) -> Result<Manifest, RuntimeError> {
        let module = self.module.clone();
        let handle = tokio::runtime::Handle::current();
        tokio::task::spawn_blocking(move || {
            let mut instance = module.instantiate(
                engine,
                GrantSet::default(),
                ContextEnvelope::default(),
                handle,
            )?;
            instance.manifest()
        })
        .await
        .map_err(|e| RuntimeError::Execution(e.to_string()))?
    }

    pub async fn schema(&self, engine: Arc<PolicyEngine>) -> Result<Option<Vec<u8>>, RuntimeError> {
        let module = self.module.clone();
        let handle = tokio::runtime::Handle::current();
        tokio::task::spawn_blocking(move || {
            let mut instance = module.instantiate(
                engine,
                GrantSet::default(),
                ContextEnvelope::default(),
                handle,
            )?;
            instance.schema()
        })
        .await
        .map_err(|e| RuntimeError::Execution(e.to_string()))?
    }

    pub async fn check(
        &self,
        engine: Arc<PolicyEngine>,
        grants: GrantSet,
        context: ContextEnvelope,
        request_json: Vec<u8>,
    ) -> Result<Outcome, RuntimeError> {
        let module = self.module.clone();
        let handle = tokio::runtime::Handle::current();
        tokio::task::spawn_blocking(move || {
            let mut instance = module.instantiate(engine, grants, context, handle)?;
            instance.check(&request_json)
        })
        .await
        .map_err(|e| RuntimeError::Execution(e.to_string()))?
    }
}
