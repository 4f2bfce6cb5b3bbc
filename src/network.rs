//! Backing-store client the pipeline is constructed with.
//!
//! The wire protocol of the underlying network lives in the implementations;
//! loaders only see transactions, their data, and paged interaction queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::contract::{ContractId, HeightRange, Interaction};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Network unavailable: {0}")]
    Unavailable(String),
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

pub type NetworkResult<T> = Result<T, NetworkError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkTransaction {
    pub id: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl NetworkTransaction {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }
}

/// One page of an interaction scan; `next_cursor` is `None` on the last page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionPage {
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[mockall::automock]
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Transaction header (owner, tags, height) without its data.
    async fn transaction(&self, id: &str) -> NetworkResult<NetworkTransaction>;

    /// Raw transaction data decoded as UTF-8.
    async fn transaction_data(&self, id: &str) -> NetworkResult<String>;

    /// Height of the newest block the network knows about.
    async fn current_height(&self) -> NetworkResult<u64>;

    async fn query_interactions(
        &self,
        contract_id: &ContractId,
        range: HeightRange,
        cursor: Option<String>,
    ) -> NetworkResult<InteractionPage>;
}
