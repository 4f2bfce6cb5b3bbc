use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Slot a component occupies in a pipeline.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum ComponentRole {
    DefinitionLoader,
    InteractionsLoader,
    ExecutorFactory,
    StateEvaluator,
}

/// Self-description of a component, used for logging and for inspecting a
/// built pipeline. Decorators report what they wrap through `inner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner: Option<Box<ComponentDescriptor>>,
}

impl ComponentDescriptor {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            params: BTreeMap::new(),
            inner: None,
        }
    }

    pub fn with_param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn wrapping(mut self, inner: ComponentDescriptor) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn inner(&self) -> Option<&ComponentDescriptor> {
        self.inner.as_deref()
    }
}

impl fmt::Display for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.params.is_empty() {
            let params = self
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "[{}]", params)?;
        }
        if let Some(inner) = &self.inner {
            write!(f, "({})", inner)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_roles_in_declaration_order() {
        let roles: Vec<_> = ComponentRole::iter().collect();
        assert_eq!(
            roles,
            vec![
                ComponentRole::DefinitionLoader,
                ComponentRole::InteractionsLoader,
                ComponentRole::ExecutorFactory,
                ComponentRole::StateEvaluator,
            ]
        );
        assert_eq!(ComponentRole::ExecutorFactory.to_string(), "ExecutorFactory");
    }

    #[test]
    fn test_descriptor_display() {
        let descriptor = ComponentDescriptor::new("caching-interactions").wrapping(
            ComponentDescriptor::new("gateway-interactions")
                .with_param("address", "X")
                .with_param("confirmation_status", "confirmed"),
        );
        assert_eq!(
            descriptor.to_string(),
            "caching-interactions(gateway-interactions[address=X, confirmation_status=confirmed])"
        );
        assert_eq!(descriptor.inner().unwrap().param("address"), Some("X"));
        assert_eq!(descriptor.param("address"), None);
    }

    #[test]
    fn test_descriptor_serialization_skips_empty() {
        let descriptor = ComponentDescriptor::new("network-definitions");
        assert_eq!(
            serde_json::to_string(&descriptor).unwrap(),
            r#"{"kind":"network-definitions"}"#
        );
    }
}
