pub mod gateway;
pub mod network;

pub use gateway::{GatewayDefinitionLoader, GatewayInteractionsLoader};
pub use network::{NetworkDefinitionLoader, NetworkInteractionsLoader};
