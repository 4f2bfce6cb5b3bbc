//! Loaders that read straight from the backing network client.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{
    component::{
        loader::{DefinitionLoader, InteractionsLoader},
        role::ComponentDescriptor,
        types::{LoaderError, LoaderResult},
    },
    config::Environment,
    contract::{ContractDefinition, ContractId, HeightRange, Interaction},
    network::{NetworkClient, NetworkError},
};

pub const CONTRACT_SOURCE_TAG: &str = "Contract-Src";
pub const INIT_STATE_TAG: &str = "Init-State";
/// Marks interactions submitted against a test deployment.
pub const TESTNET_TAG: &str = "Contract-Testnet";

fn from_network(error: NetworkError) -> LoaderError {
    match error {
        NetworkError::TransactionNotFound(id) => LoaderError::NotFound(id),
        other => LoaderError::Network(other),
    }
}

pub struct NetworkDefinitionLoader {
    client: Arc<dyn NetworkClient>,
}

impl NetworkDefinitionLoader {
    pub fn new(client: Arc<dyn NetworkClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DefinitionLoader for NetworkDefinitionLoader {
    #[instrument(level = "debug", skip(self))]
    async fn load(&self, contract_id: &ContractId) -> LoaderResult<ContractDefinition> {
        let transaction = self
            .client
            .transaction(contract_id.as_str())
            .await
            .map_err(from_network)?;

        let source_id = transaction
            .tag(CONTRACT_SOURCE_TAG)
            .ok_or_else(|| {
                LoaderError::Malformed(format!(
                    "{} has no {} tag",
                    contract_id, CONTRACT_SOURCE_TAG
                ))
            })?
            .to_string();

        let source = self
            .client
            .transaction_data(&source_id)
            .await
            .map_err(from_network)?;

        let raw_state = match transaction.tag(INIT_STATE_TAG) {
            Some(state) => state.to_string(),
            None => self
                .client
                .transaction_data(contract_id.as_str())
                .await
                .map_err(from_network)?,
        };
        let init_state: Value = serde_json::from_str(&raw_state).map_err(|e| {
            LoaderError::Malformed(format!("initial state of {} is not JSON: {}", contract_id, e))
        })?;

        let mut metadata = transaction.tags.clone();
        metadata.remove(INIT_STATE_TAG);

        debug!("loaded definition of {} from source {}", contract_id, source_id);

        Ok(ContractDefinition {
            contract_id: contract_id.clone(),
            source_id,
            source,
            init_state,
            owner: transaction.owner,
            metadata,
        })
    }

    fn describe(&self) -> ComponentDescriptor {
        ComponentDescriptor::new("network-definitions")
    }
}

/// Scans every page the network client returns for a contract.
pub struct NetworkInteractionsLoader {
    client: Arc<dyn NetworkClient>,
    environment: Environment,
}

impl NetworkInteractionsLoader {
    pub fn new(client: Arc<dyn NetworkClient>, environment: Environment) -> Self {
        Self {
            client,
            environment,
        }
    }

    fn accepts(&self, interaction: &Interaction) -> bool {
        let testnet = interaction.tag(TESTNET_TAG).is_some();
        match self.environment {
            Environment::Testnet => testnet,
            _ => !testnet,
        }
    }
}

#[async_trait]
impl InteractionsLoader for NetworkInteractionsLoader {
    #[instrument(level = "debug", skip(self))]
    async fn load(
        &self,
        contract_id: &ContractId,
        range: HeightRange,
    ) -> LoaderResult<Vec<Interaction>> {
        let mut interactions = Vec::new();
        let mut cursor = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .client
                .query_interactions(contract_id, range, cursor)
                .await?;
            pages += 1;
            interactions.extend(
                page.interactions
                    .into_iter()
                    .filter(|i| range.contains(i.block_height) && self.accepts(i)),
            );
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        interactions.sort_by(|a, b| a.replay_order(b));
        debug!(
            "scanned {} pages, {} interactions for {}",
            pages,
            interactions.len(),
            contract_id
        );
        Ok(interactions)
    }

    fn describe(&self) -> ComponentDescriptor {
        ComponentDescriptor::new("network-interactions")
            .with_param("environment", self.environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{InteractionPage, MockNetworkClient, NetworkTransaction};
    use mockall::predicate::eq;
    use serde_json::json;
    use std::collections::HashMap;

    fn contract_transaction(tags: &[(&str, &str)]) -> NetworkTransaction {
        NetworkTransaction {
            id: "c1".to_string(),
            owner: Some("alice".to_string()),
            block_height: Some(100),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn test_definition_from_tags() {
        let mut client = MockNetworkClient::new();
        client
            .expect_transaction()
            .with(eq("c1"))
            .returning(|_| {
                Ok(contract_transaction(&[
                    (CONTRACT_SOURCE_TAG, "src-1"),
                    (INIT_STATE_TAG, r#"{"count":0}"#),
                ]))
            });
        client
            .expect_transaction_data()
            .with(eq("src-1"))
            .times(1)
            .returning(|_| Ok("export function handle() {}".to_string()));

        let loader = NetworkDefinitionLoader::new(Arc::new(client));
        let definition = loader.load(&ContractId::new("c1")).await.unwrap();

        assert_eq!(definition.source_id, "src-1");
        assert_eq!(definition.source, "export function handle() {}");
        assert_eq!(definition.init_state, json!({"count": 0}));
        assert_eq!(definition.owner.as_deref(), Some("alice"));
        assert!(!definition.metadata.contains_key(INIT_STATE_TAG));
    }

    #[tokio::test]
    async fn test_definition_state_from_transaction_data() {
        let mut client = MockNetworkClient::new();
        client
            .expect_transaction()
            .returning(|_| Ok(contract_transaction(&[(CONTRACT_SOURCE_TAG, "src-1")])));
        client
            .expect_transaction_data()
            .with(eq("src-1"))
            .returning(|_| Ok("function handle() {}".to_string()));
        client
            .expect_transaction_data()
            .with(eq("c1"))
            .returning(|_| Ok(r#"{"owner":"alice"}"#.to_string()));

        let loader = NetworkDefinitionLoader::new(Arc::new(client));
        let definition = loader.load(&ContractId::new("c1")).await.unwrap();
        assert_eq!(definition.init_state, json!({"owner": "alice"}));
    }

    #[tokio::test]
    async fn test_definition_errors() {
        let mut client = MockNetworkClient::new();
        client
            .expect_transaction()
            .with(eq("missing"))
            .returning(|id| Err(NetworkError::TransactionNotFound(id.to_string())));
        client
            .expect_transaction()
            .with(eq("untagged"))
            .returning(|_| Ok(contract_transaction(&[])));

        let loader = NetworkDefinitionLoader::new(Arc::new(client));
        assert_eq!(
            loader.load(&ContractId::new("missing")).await.unwrap_err(),
            LoaderError::NotFound("missing".to_string())
        );
        assert!(matches!(
            loader.load(&ContractId::new("untagged")).await,
            Err(LoaderError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_definition_rejects_non_json_state() {
        let mut client = MockNetworkClient::new();
        client.expect_transaction().returning(|_| {
            Ok(contract_transaction(&[
                (CONTRACT_SOURCE_TAG, "src-1"),
                (INIT_STATE_TAG, "not json"),
            ]))
        });
        client
            .expect_transaction_data()
            .returning(|_| Ok("function handle() {}".to_string()));

        let loader = NetworkDefinitionLoader::new(Arc::new(client));
        assert!(matches!(
            loader.load(&ContractId::new("c1")).await,
            Err(LoaderError::Malformed(_))
        ));
    }

    fn paged_client() -> MockNetworkClient {
        let mut client = MockNetworkClient::new();
        client
            .expect_query_interactions()
            .withf(|_, _, cursor| cursor.is_none())
            .times(1)
            .returning(|_, _, _| {
                Ok(InteractionPage {
                    interactions: vec![
                        Interaction::new("tx3", 12, "000012"),
                        Interaction::new("tx1", 10, "000010"),
                        Interaction::new("old", 1, "000001"),
                    ],
                    next_cursor: Some("page-2".to_string()),
                })
            });
        client
            .expect_query_interactions()
            .withf(|_, _, cursor| cursor.as_deref() == Some("page-2"))
            .times(1)
            .returning(|_, _, _| {
                Ok(InteractionPage {
                    interactions: vec![
                        Interaction::new("tx2", 11, "000011"),
                        Interaction::new("test", 11, "000011").with_tag(TESTNET_TAG, "1.0.0"),
                    ],
                    next_cursor: None,
                })
            });
        client
    }

    #[tokio::test]
    async fn test_interactions_scan_all_pages() {
        let loader = NetworkInteractionsLoader::new(Arc::new(paged_client()), Environment::Mainnet);
        let interactions = loader
            .load(&ContractId::new("c1"), HeightRange::new(10, 20).unwrap())
            .await
            .unwrap();

        let ids: Vec<_> = interactions.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["tx1", "tx2", "tx3"]);
    }

    #[tokio::test]
    async fn test_testnet_keeps_only_tagged_interactions() {
        let loader = NetworkInteractionsLoader::new(Arc::new(paged_client()), Environment::Testnet);
        let interactions = loader
            .load(&ContractId::new("c1"), HeightRange::new(10, 20).unwrap())
            .await
            .unwrap();

        let ids: Vec<_> = interactions.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["test"]);
    }

    #[tokio::test]
    async fn test_network_failure_propagates() {
        let mut client = MockNetworkClient::new();
        client
            .expect_query_interactions()
            .returning(|_, _, _| Err(NetworkError::Unavailable("timeout".to_string())));

        let loader = NetworkInteractionsLoader::new(Arc::new(client), Environment::Custom);
        assert_eq!(
            loader
                .load(&ContractId::new("c1"), HeightRange::new(0, 1).unwrap())
                .await
                .unwrap_err(),
            LoaderError::Network(NetworkError::Unavailable("timeout".to_string()))
        );
    }

    #[test]
    fn test_describe() {
        let loader = NetworkInteractionsLoader::new(
            Arc::new(MockNetworkClient::new()),
            Environment::Testnet,
        );
        assert_eq!(loader.describe().param("environment"), Some("testnet"));
    }
}
