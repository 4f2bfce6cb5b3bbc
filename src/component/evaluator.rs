use async_trait::async_trait;

use crate::contract::{ContractId, ContractState, Interaction};

use super::{role::ComponentDescriptor, types::EvaluationResult};

/// Derives contract state by replaying interactions.
#[mockall::automock]
#[async_trait]
pub trait StateEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        contract_id: &ContractId,
        interactions: &[Interaction],
    ) -> EvaluationResult<ContractState>;

    fn describe(&self) -> ComponentDescriptor;
}
