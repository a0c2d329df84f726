// Infrastructure layer - configuration and external adapters
pub mod config;
pub mod endpoint_registry;
pub mod http_gateway;
