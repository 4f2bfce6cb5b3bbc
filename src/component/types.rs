use thiserror::Error;

use crate::{cache::CacheError, network::NetworkError, normalizer::NormalizationError};

/// Errors raised by definition and interaction loaders.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoaderError {
    #[error("Contract not found: {0}")]
    NotFound(String),

    #[error("Malformed contract definition: {0}")]
    Malformed(String),

    #[error("Data source unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid height range: {from} > {to}")]
    InvalidRange { from: u64, to: u64 },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

pub type LoaderResult<T> = Result<T, LoaderError>;

/// Errors raised while preparing or running a contract executor.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutorError {
    #[error("Invalid contract source: {0}")]
    InvalidSource(String),

    #[error("Sandbox error: {0}")]
    Sandbox(String),

    #[error("Normalization error: {0}")]
    Normalization(#[from] NormalizationError),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Errors raised by a state evaluator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Evaluation failed: {0}")]
    Failed(String),

    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),
}

pub type EvaluationResult<T> = Result<T, EvaluationError>;
