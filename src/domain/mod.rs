// Domain layer - dashboard state with no I/O
pub mod dashboard;
pub mod error_log;
pub mod health;
pub mod selection;
pub mod series;
pub mod source;
