use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    component::{
        executor::{Executor, ExecutorFactory},
        role::ComponentDescriptor,
        types::ExecutorResult,
    },
    contract::ContractDefinition,
};

/// Runs a fixed source body in place of whatever the definition carries.
///
/// Meant for trying out a contract locally before it is published.
pub struct SourceOverrideExecutorFactory {
    inner: Arc<dyn ExecutorFactory>,
    source: String,
}

impl SourceOverrideExecutorFactory {
    pub fn new(inner: Arc<dyn ExecutorFactory>, source: &str) -> Self {
        Self {
            inner,
            source: source.to_string(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[async_trait]
impl ExecutorFactory for SourceOverrideExecutorFactory {
    async fn create(&self, definition: &ContractDefinition) -> ExecutorResult<Arc<dyn Executor>> {
        debug!(
            "overriding source of {} ({} bytes)",
            definition.contract_id,
            self.source.len()
        );
        let overridden = ContractDefinition {
            source: self.source.clone(),
            ..definition.clone()
        };
        self.inner.create(&overridden).await
    }

    fn describe(&self) -> ComponentDescriptor {
        ComponentDescriptor::new("source-override")
            .with_param("source_bytes", self.source.len())
            .wrapping(self.inner.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        component::{executor::MockExecutorFactory, types::ExecutorError},
        contract::ContractId,
    };
    use serde_json::json;

    #[tokio::test]
    async fn test_substitutes_source_before_delegating() {
        let mut inner = MockExecutorFactory::new();
        inner
            .expect_create()
            .withf(|definition| {
                definition.source == "function handle() { return 42; }"
                    && definition.source_id == "src-1"
                    && definition.contract_id == ContractId::new("c1")
            })
            .times(1)
            .returning(|_| Err(ExecutorError::Sandbox("stop here".to_string())));

        let factory =
            SourceOverrideExecutorFactory::new(Arc::new(inner), "function handle() { return 42; }");
        let definition = ContractDefinition::new(
            ContractId::new("c1"),
            "src-1",
            "function handle() { return 0; }",
            json!({}),
        );

        let result = factory.create(&definition).await;
        assert!(matches!(result, Err(ExecutorError::Sandbox(_))));
    }

    #[test]
    fn test_describe() {
        let mut inner = MockExecutorFactory::new();
        inner
            .expect_describe()
            .returning(|| ComponentDescriptor::new("sandbox-executor"));
        let factory = SourceOverrideExecutorFactory::new(Arc::new(inner), "abc");

        let descriptor = factory.describe();
        assert_eq!(descriptor.kind, "source-override");
        assert_eq!(descriptor.param("source_bytes"), Some("3"));
        assert_eq!(descriptor.inner().unwrap().kind, "sandbox-executor");
        assert_eq!(factory.source(), "abc");
    }
}
