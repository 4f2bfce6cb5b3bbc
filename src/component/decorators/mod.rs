pub mod caching_interactions_loader;
pub mod source_override_executor_factory;

pub use caching_interactions_loader::CachingInteractionsLoader;
pub use source_override_executor_factory::SourceOverrideExecutorFactory;
