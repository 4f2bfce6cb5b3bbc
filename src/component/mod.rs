//! Strategy components a [`Pipeline`](crate::pipeline::Pipeline) is composed of.
//!
//! Each role is an object-safe async trait. Concrete implementations live in
//! [`loaders`] and [`sandbox`]; [`decorators`] wrap an implementation of a
//! role and expose the same role, so they can be stacked freely.

pub mod decorators;
pub mod evaluator;
pub mod executor;
pub mod loader;
pub mod loaders;
pub mod role;
pub mod sandbox;
pub mod types;

pub use evaluator::StateEvaluator;
pub use executor::{Executor, ExecutorFactory};
pub use loader::{DefinitionLoader, InteractionsLoader};
pub use role::{ComponentDescriptor, ComponentRole};
pub use types::{
    EvaluationError, EvaluationResult, ExecutorError, ExecutorResult, LoaderError, LoaderResult,
};
