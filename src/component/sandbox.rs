//! Executor factory that prepares contract source for a host sandbox.
//!
//! The sandbox itself (a JS engine, a remote runner, ...) is supplied by the
//! embedding application through the [`Sandbox`] trait. This module only makes
//! sure the code it receives has been through the [`SourceNormalizer`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{
    contract::{ContractDefinition, ContractId, ExecutionContext},
    normalizer::{SandboxBindings, SandboxMode, SourceNormalizer},
};

use super::{
    executor::{Executor, ExecutorFactory},
    role::ComponentDescriptor,
    types::{ExecutorError, ExecutorResult},
};

/// Runs normalized contract code.
#[mockall::automock]
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn run(
        &self,
        code: &str,
        mode: SandboxMode,
        context: &ExecutionContext,
        input: Value,
    ) -> ExecutorResult<Value>;
}

pub struct SandboxExecutorFactory {
    sandbox: Arc<dyn Sandbox>,
    mode: SandboxMode,
    normalizer: SourceNormalizer,
}

impl SandboxExecutorFactory {
    pub fn new(sandbox: Arc<dyn Sandbox>, mode: SandboxMode) -> Self {
        Self {
            sandbox,
            mode,
            normalizer: SourceNormalizer::default(),
        }
    }

    pub fn with_bindings(
        sandbox: Arc<dyn Sandbox>,
        mode: SandboxMode,
        bindings: SandboxBindings,
    ) -> ExecutorResult<Self> {
        Ok(Self {
            sandbox,
            mode,
            normalizer: SourceNormalizer::new(bindings)?,
        })
    }

    pub fn mode(&self) -> SandboxMode {
        self.mode
    }
}

#[async_trait]
impl ExecutorFactory for SandboxExecutorFactory {
    #[instrument(level = "debug", skip(self, definition), fields(contract_id = %definition.contract_id))]
    async fn create(&self, definition: &ContractDefinition) -> ExecutorResult<Arc<dyn Executor>> {
        if definition.source.trim().is_empty() {
            return Err(ExecutorError::InvalidSource(format!(
                "{} has an empty source",
                definition.contract_id
            )));
        }

        let code = self.normalizer.normalize(&definition.source, self.mode);
        debug!("prepared {} for {} sandbox", definition.contract_id, self.mode);

        Ok(Arc::new(SandboxExecutor {
            contract_id: definition.contract_id.clone(),
            code,
            mode: self.mode,
            sandbox: self.sandbox.clone(),
        }))
    }

    fn describe(&self) -> ComponentDescriptor {
        ComponentDescriptor::new("sandbox-executor").with_param("mode", self.mode)
    }
}

pub struct SandboxExecutor {
    contract_id: ContractId,
    code: String,
    mode: SandboxMode,
    sandbox: Arc<dyn Sandbox>,
}

#[async_trait]
impl Executor for SandboxExecutor {
    fn contract_id(&self) -> &ContractId {
        &self.contract_id
    }

    fn code(&self) -> &str {
        &self.code
    }

    async fn invoke(&self, context: &ExecutionContext, input: Value) -> ExecutorResult<Value> {
        self.sandbox.run(&self.code, self.mode, context, input).await
    }
}
