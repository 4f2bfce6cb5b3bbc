use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::contract::{ContractDefinition, ContractId, ExecutionContext};

use super::{role::ComponentDescriptor, types::ExecutorResult};

/// A contract prepared for invocation.
#[async_trait]
pub trait Executor: Send + Sync {
    fn contract_id(&self) -> &ContractId;

    /// Source text as handed to the sandbox.
    fn code(&self) -> &str;

    async fn invoke(&self, context: &ExecutionContext, input: Value) -> ExecutorResult<Value>;
}

/// Turns a contract definition into an [`Executor`].
///
/// Fails with `ExecutorError::InvalidSource` when the source cannot be prepared.
#[mockall::automock]
#[async_trait]
pub trait ExecutorFactory: Send + Sync {
    async fn create(&self, definition: &ContractDefinition) -> ExecutorResult<Arc<dyn Executor>>;

    fn describe(&self) -> ComponentDescriptor;
}
