// Presentation layer - HTTP view of the dashboard
pub mod app_state;
pub mod handlers;
