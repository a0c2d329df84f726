// Application state for HTTP handlers
use crate::application::controller::AggregationController;

#[derive(Clone)]
pub struct AppState {
    pub controller: AggregationController,
}
