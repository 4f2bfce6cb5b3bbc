//! Domain values shared by every pipeline component.
//!
//! These are plain data: loaders produce them, the executor factory and the
//! state evaluator consume them. None of them carry behaviour beyond ordering
//! and small constructors.

use std::{cmp::Ordering, collections::HashMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    component::types::{LoaderError, LoaderResult},
    config::ConfirmationStatus,
};

/// Identifier of a contract as known by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(String);

impl ContractId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContractId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ContractId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Static descriptor of a contract: where it came from and what it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDefinition {
    pub contract_id: ContractId,
    /// Identifier of the transaction that carries the source text.
    pub source_id: String,
    pub source: String,
    pub init_state: Value,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ContractDefinition {
    pub fn new(contract_id: ContractId, source_id: &str, source: &str, init_state: Value) -> Self {
        Self {
            contract_id,
            source_id: source_id.to_string(),
            source: source.to_string(),
            init_state,
            owner: None,
            metadata: HashMap::new(),
        }
    }
}

/// One recorded input to be replayed against a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub block_height: u64,
    pub sort_key: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub confirmation_status: Option<ConfirmationStatus>,
}

impl Interaction {
    pub fn new(id: &str, block_height: u64, sort_key: &str) -> Self {
        Self {
            id: id.to_string(),
            block_height,
            sort_key: sort_key.to_string(),
            owner: None,
            input: Value::Null,
            tags: HashMap::new(),
            confirmation_status: None,
        }
    }

    pub fn with_tag(mut self, name: &str, value: &str) -> Self {
        self.tags.insert(name.to_string(), value.to_string());
        self
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    /// Replay order: sort key first, height and id break ties.
    pub fn replay_order(&self, other: &Self) -> Ordering {
        self.sort_key
            .cmp(&other.sort_key)
            .then(self.block_height.cmp(&other.block_height))
            .then(self.id.cmp(&other.id))
    }
}

/// Inclusive block height range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeightRange {
    pub from: u64,
    pub to: u64,
}

impl HeightRange {
    pub fn new(from: u64, to: u64) -> LoaderResult<Self> {
        if from > to {
            return Err(LoaderError::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, height: u64) -> bool {
        self.from <= height && height <= self.to
    }

    /// Whether every block of the range is at least `finality_depth` below
    /// `tip`, so the range's interactions can no longer change.
    pub fn is_final(&self, tip: u64, finality_depth: u64) -> bool {
        tip.checked_sub(finality_depth)
            .is_some_and(|sealed| self.to <= sealed)
    }
}

impl fmt::Display for HeightRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// Evaluated contract state at a given height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractState {
    pub contract_id: ContractId,
    pub height: u64,
    pub state: Value,
    /// Interaction id -> whether it was applied successfully.
    #[serde(default)]
    pub validity: HashMap<String, bool>,
}

/// Source of invocation ids.
///
/// Injected instead of detected so hosts without an OS random source can
/// plug in their own generator.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Uuid;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Per-invocation context handed to an executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub invocation_id: Uuid,
    pub contract_id: ContractId,
    pub block_height: u64,
    #[serde(default)]
    pub caller: Option<String>,
}

impl ExecutionContext {
    pub fn new(ids: &Arc<dyn IdGenerator>, contract_id: ContractId, block_height: u64) -> Self {
        Self {
            invocation_id: ids.next_id(),
            contract_id,
            block_height,
            caller: None,
        }
    }

    pub fn with_caller(mut self, caller: &str) -> Self {
        self.caller = Some(caller.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_range_rejects_inverted_bounds() {
        assert!(HeightRange::new(10, 5).is_err());
        let range = HeightRange::new(5, 10).unwrap();
        assert!(range.contains(5));
        assert!(range.contains(10));
        assert!(!range.contains(11));
        assert_eq!(range.to_string(), "5-10");
    }

    #[test]
    fn test_height_range_finality() {
        let range = HeightRange::new(0, 90).unwrap();
        assert!(range.is_final(100, 10));
        assert!(!range.is_final(99, 10));
        assert!(!range.is_final(5, 10));
        assert!(!HeightRange::new(0, u64::MAX).unwrap().is_final(u64::MAX, 1));
        assert!(HeightRange::new(0, 0).unwrap().is_final(0, 0));
    }

    #[test]
    fn test_replay_order() {
        let mut interactions = vec![
            Interaction::new("c", 3, "0003"),
            Interaction::new("b", 1, "0001"),
            Interaction::new("a", 1, "0001"),
        ];
        interactions.sort_by(|a, b| a.replay_order(b));
        let ids: Vec<_> = interactions.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_execution_context_uses_injected_ids() {
        struct FixedIds;
        impl IdGenerator for FixedIds {
            fn next_id(&self) -> Uuid {
                Uuid::nil()
            }
        }

        let ids: Arc<dyn IdGenerator> = Arc::new(FixedIds);
        let context = ExecutionContext::new(&ids, ContractId::new("c1"), 7).with_caller("alice");
        assert_eq!(context.invocation_id, Uuid::nil());
        assert_eq!(context.caller.as_deref(), Some("alice"));
    }

    #[test]
    fn test_contract_id_serializes_transparently() {
        let id = ContractId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
