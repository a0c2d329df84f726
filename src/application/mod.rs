// Application layer - polling orchestration and shared dashboard state
pub mod context;
pub mod controller;
pub mod fetch_gateway;
