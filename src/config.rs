use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use crate::{
    normalizer::{SandboxBindings, SandboxMode},
    pipeline::ConfigurationError,
};

/// Deployment environment the pipeline runs in.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    Local,
    Testnet,
    Mainnet,
    #[default]
    Custom,
}

/// Which interactions a gateway should hand out.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConfirmationStatus {
    Confirmed,
    NotCorrupted,
    #[default]
    Any,
}

impl ConfirmationStatus {
    /// Query parameter value, `None` when no filtering is requested.
    pub fn as_query(&self) -> Option<String> {
        match self {
            ConfirmationStatus::Any => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayOptions {
    pub address: String,
    #[serde(default)]
    pub confirmation_status: ConfirmationStatus,
    /// Restricts interactions to a single submission source.
    #[serde(default)]
    pub source: Option<String>,
}

impl GatewayOptions {
    pub fn new(address: &str, confirmation_status: ConfirmationStatus) -> Self {
        Self {
            address: address.to_string(),
            confirmation_status,
            source: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }
}

pub const DEFAULT_FINALITY_DEPTH: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheOptions {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default, with = "option_duration_ms")]
    pub ttl: Option<Duration>,

    /// Blocks below the chain tip after which a height range can no longer
    /// gain interactions. Only such ranges are memoised.
    #[serde(default = "default_finality_depth")]
    pub finality_depth: u64,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl: None,
            finality_depth: default_finality_depth(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default)]
    pub mode: SandboxMode,
    #[serde(default)]
    pub bindings: SandboxBindings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub environment: Environment,

    /// When set, loaders go through the gateway; otherwise straight to the network.
    #[serde(default)]
    pub gateway: Option<GatewayOptions>,

    #[serde(default)]
    pub cache: CacheOptions,

    #[serde(default)]
    pub sandbox: SandboxConfig,
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(
    path: P,
) -> Result<T, ConfigurationError> {
    let file = File::open(path)
        .map_err(|e| ConfigurationError::Invalid(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| ConfigurationError::Invalid(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, ConfigurationError> {
    let config = serde_json::from_str(s)
        .map_err(|e| ConfigurationError::Invalid(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

fn default_max_entries() -> usize {
    1000
}

fn default_finality_depth() -> u64 {
    DEFAULT_FINALITY_DEPTH
}

mod option_duration_ms {
    use serde::{ser::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => {
                let millis = u64::try_from(d.as_millis())
                    .map_err(|_| S::Error::custom(format!("duration {:?} overflows u64 millis", d)))?;
                serializer.serialize_some(&millis)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
