use async_trait::async_trait;

use crate::contract::{ContractDefinition, ContractId, HeightRange, Interaction};

use super::{role::ComponentDescriptor, types::LoaderResult};

/// Resolves a contract identifier into its definition.
///
/// Fails with `LoaderError::NotFound` for unknown identifiers and
/// `LoaderError::Malformed` when the stored definition cannot be decoded.
#[mockall::automock]
#[async_trait]
pub trait DefinitionLoader: Send + Sync {
    async fn load(&self, contract_id: &ContractId) -> LoaderResult<ContractDefinition>;

    fn describe(&self) -> ComponentDescriptor;
}

/// Loads the interactions recorded for a contract within a height range,
/// in replay order.
#[mockall::automock]
#[async_trait]
pub trait InteractionsLoader: Send + Sync {
    async fn load(
        &self,
        contract_id: &ContractId,
        range: HeightRange,
    ) -> LoaderResult<Vec<Interaction>>;

    fn describe(&self) -> ComponentDescriptor;
}
