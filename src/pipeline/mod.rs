pub mod builder;
#[allow(clippy::module_inception)]
pub mod pipeline;

use thiserror::Error;

use crate::component::ComponentRole;

pub use builder::PipelineBuilder;
pub use pipeline::Pipeline;

/// Builder invariant violations. Never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("base ExecutorFactory required")]
    MissingBaseExecutorFactory,

    #[error("Pipeline is missing components: {}", format_roles(.0))]
    MissingComponents(Vec<ComponentRole>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn format_roles(roles: &[ComponentRole]) -> String {
    roles
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
