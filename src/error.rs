use thiserror::Error;

use crate::cache::CacheError;
use crate::component::types::{EvaluationError, ExecutorError, LoaderError};
use crate::network::NetworkError;
use crate::normalizer::NormalizationError;
use crate::pipeline::ConfigurationError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Normalization error: {0}")]
    Normalization(#[from] NormalizationError),
    // collaborators
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),
    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

pub type PipelineResult<T> = Result<T, Error>;
