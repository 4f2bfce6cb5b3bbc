use std::sync::Arc;

use strum::IntoEnumIterator;
use tracing::{debug, info, instrument};

use crate::{
    cache::Cache,
    component::{
        decorators::{CachingInteractionsLoader, SourceOverrideExecutorFactory},
        loaders::{
            GatewayDefinitionLoader, GatewayInteractionsLoader, NetworkDefinitionLoader,
            NetworkInteractionsLoader,
        },
        ComponentRole, DefinitionLoader, ExecutorFactory, InteractionsLoader, StateEvaluator,
    },
    config::{CacheOptions, Environment, GatewayOptions, PipelineConfig, DEFAULT_FINALITY_DEPTH},
    network::NetworkClient,
    PipelineResult,
};

use super::{ConfigurationError, Pipeline};

/// Assembles a [`Pipeline`] one role at a time.
///
/// The network client, cache and environment are fixed at construction;
/// everything else is set through the role setters or one of the presets.
/// A builder is meant to be configured from a single place and then built;
/// it is not shared between tasks.
pub struct PipelineBuilder {
    network: Arc<dyn NetworkClient>,
    cache: Arc<dyn Cache>,
    environment: Environment,
    finality_depth: u64,
    definition_loader: Option<Arc<dyn DefinitionLoader>>,
    interactions_loader: Option<Arc<dyn InteractionsLoader>>,
    executor_factory: Option<Arc<dyn ExecutorFactory>>,
    state_evaluator: Option<Arc<dyn StateEvaluator>>,
}

impl PipelineBuilder {
    pub fn new(network: Arc<dyn NetworkClient>, cache: Arc<dyn Cache>) -> Self {
        Self::with_environment(network, cache, Environment::default())
    }

    pub fn with_environment(
        network: Arc<dyn NetworkClient>,
        cache: Arc<dyn Cache>,
        environment: Environment,
    ) -> Self {
        Self {
            network,
            cache,
            environment,
            finality_depth: DEFAULT_FINALITY_DEPTH,
            definition_loader: None,
            interactions_loader: None,
            executor_factory: None,
            state_evaluator: None,
        }
    }

    /// Builder with the loader preset the configuration asks for: the gateway
    /// when one is configured, the network otherwise.
    pub fn from_config(
        network: Arc<dyn NetworkClient>,
        cache: Arc<dyn Cache>,
        config: &PipelineConfig,
    ) -> Self {
        let mut builder = Self::with_environment(network, cache, config.environment);
        builder.set_finality_depth(config.cache.finality_depth);
        match &config.gateway {
            Some(gateway) => builder.use_gateway_backed_loaders(gateway, config.cache.clone()),
            None => builder.use_decentralized_loaders(),
        };
        builder
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn finality_depth(&self) -> u64 {
        self.finality_depth
    }

    /// Depth below the chain tip at which cached ranges are considered final.
    /// Applies to presets selected afterwards and to the built pipeline.
    pub fn set_finality_depth(&mut self, finality_depth: u64) -> &mut Self {
        self.finality_depth = finality_depth;
        self
    }

    pub fn is_set(&self, role: ComponentRole) -> bool {
        match role {
            ComponentRole::DefinitionLoader => self.definition_loader.is_some(),
            ComponentRole::InteractionsLoader => self.interactions_loader.is_some(),
            ComponentRole::ExecutorFactory => self.executor_factory.is_some(),
            ComponentRole::StateEvaluator => self.state_evaluator.is_some(),
        }
    }

    pub fn missing_roles(&self) -> Vec<ComponentRole> {
        ComponentRole::iter()
            .filter(|role| !self.is_set(*role))
            .collect()
    }

    pub fn set_definition_loader(&mut self, loader: Arc<dyn DefinitionLoader>) -> &mut Self {
        self.definition_loader = Some(loader);
        self
    }

    pub fn set_interactions_loader(&mut self, loader: Arc<dyn InteractionsLoader>) -> &mut Self {
        self.interactions_loader = Some(loader);
        self
    }

    pub fn set_executor_factory(&mut self, factory: Arc<dyn ExecutorFactory>) -> &mut Self {
        self.executor_factory = Some(factory);
        self
    }

    pub fn set_state_evaluator(&mut self, evaluator: Arc<dyn StateEvaluator>) -> &mut Self {
        self.state_evaluator = Some(evaluator);
        self
    }

    /// Forces every executor to run `source` instead of the fetched contract
    /// source, then builds.
    ///
    /// Leaves the builder untouched when it fails.
    pub fn overwrite_source(&mut self, source: &str) -> PipelineResult<Pipeline> {
        let base = self
            .executor_factory
            .clone()
            .ok_or(ConfigurationError::MissingBaseExecutorFactory)?;

        let missing = self.missing_roles();
        if !missing.is_empty() {
            return Err(ConfigurationError::MissingComponents(missing).into());
        }

        debug!("overriding contract source ({} bytes)", source.len());
        self.executor_factory = Some(Arc::new(SourceOverrideExecutorFactory::new(base, source)));
        self.build()
    }

    /// Loads interactions and definitions through an indexing gateway.
    #[instrument(level = "debug", skip(self))]
    pub fn use_gateway_backed_loaders(
        &mut self,
        gateway: &GatewayOptions,
        cache_options: CacheOptions,
    ) -> &mut Self {
        info!(
            "using gateway {} ({} interactions)",
            gateway.address, gateway.confirmation_status
        );
        let interactions = GatewayInteractionsLoader::new(
            &gateway.address,
            gateway.confirmation_status,
            gateway.source.clone(),
        );
        self.interactions_loader = Some(Arc::new(
            CachingInteractionsLoader::new(
                Arc::new(interactions),
                self.cache.clone(),
                self.network.clone(),
            )
            .with_finality_depth(self.finality_depth),
        ));
        self.definition_loader = Some(Arc::new(GatewayDefinitionLoader::new(
            &gateway.address,
            self.network.clone(),
            cache_options,
        )));
        self
    }

    /// Loads interactions and definitions straight from the network client.
    #[instrument(level = "debug", skip(self))]
    pub fn use_decentralized_loaders(&mut self) -> &mut Self {
        info!("using network loaders ({} environment)", self.environment);
        self.definition_loader = Some(Arc::new(NetworkDefinitionLoader::new(self.network.clone())));
        self.interactions_loader = Some(Arc::new(
            CachingInteractionsLoader::new(
                Arc::new(NetworkInteractionsLoader::new(
                    self.network.clone(),
                    self.environment,
                )),
                self.cache.clone(),
                self.network.clone(),
            )
            .with_finality_depth(self.finality_depth),
        ));
        self
    }

    /// Snapshots the current composition. Fails when any role is unset.
    pub fn build(&self) -> PipelineResult<Pipeline> {
        let (
            Some(definition_loader),
            Some(interactions_loader),
            Some(executor_factory),
            Some(state_evaluator),
        ) = (
            &self.definition_loader,
            &self.interactions_loader,
            &self.executor_factory,
            &self.state_evaluator,
        )
        else {
            return Err(ConfigurationError::MissingComponents(self.missing_roles()).into());
        };

        debug!("building pipeline for {} environment", self.environment);
        Ok(Pipeline::new(
            self.network.clone(),
            self.cache.clone(),
            definition_loader.clone(),
            interactions_loader.clone(),
            executor_factory.clone(),
            state_evaluator.clone(),
            self.environment,
            self.finality_depth,
        ))
    }
}
