//! Loaders backed by an indexing gateway's HTTP API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::{
    cache::{Cache, CacheError, MemoryCache},
    component::{
        loader::{DefinitionLoader, InteractionsLoader},
        role::ComponentDescriptor,
        types::{LoaderError, LoaderResult},
    },
    config::{CacheOptions, ConfirmationStatus},
    contract::{ContractDefinition, ContractId, HeightRange, Interaction},
    network::NetworkClient,
};

use super::network::NetworkDefinitionLoader;

pub fn strip_trailing_slash(address: &str) -> &str {
    address.strip_suffix('/').unwrap_or(address)
}

async fn get_text(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    not_found: impl FnOnce() -> LoaderError,
) -> LoaderResult<String> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| LoaderError::Unavailable(format!("{}: {}", url, e)))?;

    match response.status() {
        StatusCode::NOT_FOUND => Err(not_found()),
        status if !status.is_success() => Err(LoaderError::Unavailable(format!(
            "{} answered {}",
            url, status
        ))),
        _ => response
            .text()
            .await
            .map_err(|e| LoaderError::Unavailable(format!("{}: {}", url, e))),
    }
}

#[derive(Debug, Deserialize)]
struct InteractionsResponse {
    #[serde(default)]
    interactions: Vec<Interaction>,
    #[serde(default)]
    paging: Paging,
}

#[derive(Debug, Default, Deserialize)]
struct Paging {
    #[serde(default)]
    pages: u32,
}

fn parse_interactions_page(body: &str) -> LoaderResult<(Vec<Interaction>, u32)> {
    let response: InteractionsResponse = serde_json::from_str(body)
        .map_err(|e| LoaderError::Unavailable(format!("unexpected gateway response: {}", e)))?;
    Ok((response.interactions, response.paging.pages))
}

pub struct GatewayInteractionsLoader {
    address: String,
    confirmation_status: ConfirmationStatus,
    source: Option<String>,
    client: Client,
}

impl GatewayInteractionsLoader {
    pub fn new(address: &str, confirmation_status: ConfirmationStatus, source: Option<String>) -> Self {
        Self {
            address: strip_trailing_slash(address).to_string(),
            confirmation_status,
            source,
            client: Client::new(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn confirmation_status(&self) -> ConfirmationStatus {
        self.confirmation_status
    }

    fn query(&self, contract_id: &ContractId, range: HeightRange, page: u32) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("contractId", contract_id.to_string()),
            ("from", range.from.to_string()),
            ("to", range.to.to_string()),
            ("page", page.to_string()),
        ];
        if let Some(status) = self.confirmation_status.as_query() {
            query.push(("confirmationStatus", status));
        }
        if let Some(source) = &self.source {
            query.push(("source", source.clone()));
        }
        query
    }
}

#[async_trait]
impl InteractionsLoader for GatewayInteractionsLoader {
    #[instrument(level = "debug", skip(self))]
    async fn load(
        &self,
        contract_id: &ContractId,
        range: HeightRange,
    ) -> LoaderResult<Vec<Interaction>> {
        let url = format!("{}/gateway/interactions", self.address);
        let mut interactions = Vec::new();
        let mut page = 1;

        loop {
            let body = get_text(&self.client, &url, &self.query(contract_id, range, page), || {
                LoaderError::NotFound(contract_id.to_string())
            })
            .await?;
            let (batch, pages) = parse_interactions_page(&body)?;
            interactions.extend(batch);
            if page >= pages {
                break;
            }
            page += 1;
        }

        interactions.sort_by(|a, b| a.replay_order(b));
        debug!("gateway returned {} interactions for {}", interactions.len(), contract_id);
        Ok(interactions)
    }

    fn describe(&self) -> ComponentDescriptor {
        let descriptor = ComponentDescriptor::new("gateway-interactions")
            .with_param("address", &self.address)
            .with_param("confirmation_status", self.confirmation_status);
        match &self.source {
            Some(source) => descriptor.with_param("source", source),
            None => descriptor,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractResponse {
    tx_id: String,
    src_tx_id: String,
    #[serde(default)]
    src: Option<String>,
    #[serde(default)]
    init_state: Value,
    #[serde(default)]
    owner: Option<String>,
}

fn parse_definition(body: &str) -> LoaderResult<ContractDefinition> {
    let response: ContractResponse = serde_json::from_str(body)
        .map_err(|e| LoaderError::Malformed(format!("unexpected gateway response: {}", e)))?;
    let source = response
        .src
        .ok_or_else(|| LoaderError::Malformed(format!("{} has no source", response.tx_id)))?;

    Ok(ContractDefinition {
        contract_id: ContractId::new(response.tx_id),
        source_id: response.src_tx_id,
        source,
        init_state: response.init_state,
        owner: response.owner,
        metadata: Default::default(),
    })
}

/// Fetches definitions from the gateway, falling back to the network when the
/// gateway cannot be reached. Loaded definitions are memoised.
pub struct GatewayDefinitionLoader {
    address: String,
    client: Client,
    fallback: NetworkDefinitionLoader,
    cache: Arc<dyn Cache>,
}

impl GatewayDefinitionLoader {
    pub fn new(address: &str, network: Arc<dyn NetworkClient>, cache_options: CacheOptions) -> Self {
        Self {
            address: strip_trailing_slash(address).to_string(),
            client: Client::new(),
            fallback: NetworkDefinitionLoader::new(network),
            cache: Arc::new(MemoryCache::new(cache_options)),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn fetch(&self, contract_id: &ContractId) -> LoaderResult<ContractDefinition> {
        let url = format!("{}/gateway/contract", self.address);
        let body = get_text(
            &self.client,
            &url,
            &[("txId", contract_id.to_string())],
            || LoaderError::NotFound(contract_id.to_string()),
        )
        .await?;
        parse_definition(&body)
    }
}

#[async_trait]
impl DefinitionLoader for GatewayDefinitionLoader {
    #[instrument(level = "debug", skip(self))]
    async fn load(&self, contract_id: &ContractId) -> LoaderResult<ContractDefinition> {
        let key = format!("definition/{}", contract_id);
        if let Some(cached) = self.cache.get(&key).await? {
            if let Ok(definition) = serde_json::from_value::<ContractDefinition>(cached) {
                debug!("definition of {} served from cache", contract_id);
                return Ok(definition);
            }
        }

        let definition = match self.fetch(contract_id).await {
            Ok(definition) => definition,
            Err(LoaderError::Unavailable(reason)) => {
                warn!("gateway unavailable ({}), loading {} from network", reason, contract_id);
                self.fallback.load(contract_id).await?
            }
            Err(e) => return Err(e),
        };

        let value = serde_json::to_value(&definition)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.cache.put(&key, value).await?;
        Ok(definition)
    }

    fn describe(&self) -> ComponentDescriptor {
        ComponentDescriptor::new("gateway-definitions").with_param("address", &self.address)
    }
}
