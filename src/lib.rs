//! # contract-pipeline
//!
//! Assembles the pipeline used to run untrusted contract programs against
//! externally supplied data, and prepares contract source so it can be invoked
//! inside a restricted sandbox.
//!
//! ## Composition
//!
//! A [`Pipeline`] is made of four interchangeable strategy components, one per
//! [`ComponentRole`](component::ComponentRole):
//!
//! - Definition loading ([`component::DefinitionLoader`])
//! - Interaction loading ([`component::InteractionsLoader`])
//! - Executor creation ([`component::ExecutorFactory`])
//! - State evaluation ([`component::StateEvaluator`])
//!
//! They are wired together by a [`PipelineBuilder`], either one by one or
//! through one of the two loader presets:
//!
//! - [`PipelineBuilder::use_gateway_backed_loaders`]: an indexing gateway serves
//!   definitions and interactions.
//! - [`PipelineBuilder::use_decentralized_loaders`]: everything is read from
//!   the backing [`NetworkClient`](network::NetworkClient).
//!
//! Components can be wrapped by the [`decorators`](component::decorators),
//! which expose the same role as what they wrap.
//!
//! ## Source normalization
//!
//! ```text
//! contract source → strip wrapper → rewrite entry point → mode prologue/trailer → sandbox
//! ```
//!
//! The [`normalizer`] module performs this rewrite; the
//! [`SandboxExecutorFactory`](component::sandbox::SandboxExecutorFactory)
//! applies it to every definition before handing the code to the host sandbox.

pub mod cache;
pub mod component;
pub mod config;
pub mod contract;
pub mod error;
pub mod network;
pub mod normalizer;
pub mod pipeline;

// Re-exports
pub use error::*;
pub use normalizer::{normalize, SandboxMode};
pub use pipeline::{ConfigurationError, Pipeline, PipelineBuilder};
