use std::{collections::BTreeMap, sync::Arc};

use tracing::{debug, instrument};

use crate::{
    cache::{Cache, CacheError},
    component::{
        ComponentDescriptor, ComponentRole, DefinitionLoader, Executor, ExecutorFactory,
        InteractionsLoader, StateEvaluator,
    },
    config::Environment,
    contract::{ContractId, ContractState, HeightRange},
    network::NetworkClient,
    PipelineResult,
};

/// Fully wired set of components.
///
/// A `Pipeline` can only be obtained from a
/// [`PipelineBuilder`](super::PipelineBuilder) and has no way to swap its
/// components afterwards; clones share the same component instances.
#[derive(Clone)]
pub struct Pipeline {
    network: Arc<dyn NetworkClient>,
    cache: Arc<dyn Cache>,
    definition_loader: Arc<dyn DefinitionLoader>,
    interactions_loader: Arc<dyn InteractionsLoader>,
    executor_factory: Arc<dyn ExecutorFactory>,
    state_evaluator: Arc<dyn StateEvaluator>,
    environment: Environment,
    finality_depth: u64,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        network: Arc<dyn NetworkClient>,
        cache: Arc<dyn Cache>,
        definition_loader: Arc<dyn DefinitionLoader>,
        interactions_loader: Arc<dyn InteractionsLoader>,
        executor_factory: Arc<dyn ExecutorFactory>,
        state_evaluator: Arc<dyn StateEvaluator>,
        environment: Environment,
        finality_depth: u64,
    ) -> Self {
        Self {
            network,
            cache,
            definition_loader,
            interactions_loader,
            executor_factory,
            state_evaluator,
            environment,
            finality_depth,
        }
    }

    pub fn network(&self) -> &Arc<dyn NetworkClient> {
        &self.network
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn definition_loader(&self) -> &Arc<dyn DefinitionLoader> {
        &self.definition_loader
    }

    pub fn interactions_loader(&self) -> &Arc<dyn InteractionsLoader> {
        &self.interactions_loader
    }

    pub fn executor_factory(&self) -> &Arc<dyn ExecutorFactory> {
        &self.executor_factory
    }

    pub fn state_evaluator(&self) -> &Arc<dyn StateEvaluator> {
        &self.state_evaluator
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn finality_depth(&self) -> u64 {
        self.finality_depth
    }

    pub fn describe(&self) -> BTreeMap<ComponentRole, ComponentDescriptor> {
        BTreeMap::from([
            (
                ComponentRole::DefinitionLoader,
                self.definition_loader.describe(),
            ),
            (
                ComponentRole::InteractionsLoader,
                self.interactions_loader.describe(),
            ),
            (
                ComponentRole::ExecutorFactory,
                self.executor_factory.describe(),
            ),
            (ComponentRole::StateEvaluator, self.state_evaluator.describe()),
        ])
    }

    /// Loads the contract definition and prepares an executor for it.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_executor(&self, contract_id: &ContractId) -> PipelineResult<Arc<dyn Executor>> {
        let definition = self.definition_loader.load(contract_id).await?;
        let executor = self.executor_factory.create(&definition).await?;
        Ok(executor)
    }

    /// Evaluates contract state over `range`.
    ///
    /// The result is memoised in the pipeline cache once `range` is final,
    /// i.e. ends at least `finality_depth` blocks below the chain tip.
    #[instrument(level = "debug", skip(self))]
    pub async fn read_state(
        &self,
        contract_id: &ContractId,
        range: HeightRange,
    ) -> PipelineResult<ContractState> {
        let key = format!("state/{}/{}", contract_id, range);
        if let Some(cached) = self.cache.get(&key).await? {
            if let Ok(state) = serde_json::from_value::<ContractState>(cached) {
                debug!("state of {} at {} served from cache", contract_id, range);
                return Ok(state);
            }
        }

        let tip = self.network.current_height().await?;
        let interactions = self.interactions_loader.load(contract_id, range).await?;
        let state = self
            .state_evaluator
            .evaluate(contract_id, &interactions)
            .await?;

        if !range.is_final(tip, self.finality_depth) {
            debug!("state of {} at {} is not final at tip {}", contract_id, range, tip);
            return Ok(state);
        }

        let value =
            serde_json::to_value(&state).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.cache.put(&key, value).await?;
        Ok(state)
    }
}
