// HTTP request handlers
use crate::domain::dashboard::DashboardView;
use crate::domain::selection::{EventType, SelectionError};
use crate::presentation::app_state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SelectRequest {
    pub index: u32,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(dashboard))
        .route("/dashboard/text", get(dashboard_text))
        .route("/selections/:event_type", put(select_event))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness of the dashboard process itself, not of the backends
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(state.controller.view())
}

pub async fn dashboard_text(State(state): State<Arc<AppState>>) -> String {
    state.controller.view().render_text()
}

/// Choose an event index, then refetch the sources showing that event type
pub async fn select_event(
    Path(event_type): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectRequest>,
) -> Response {
    let event_type = EventType::new(event_type);

    match state.controller.select(&event_type, request.index) {
        Ok(()) => {
            state.controller.refresh_selector(&event_type).await;
            Json(state.controller.view()).into_response()
        }
        Err(e) => {
            tracing::warn!(event_type = %event_type, index = request.index, "rejected selection: {}", e);
            let status = match e {
                SelectionError::UnknownEventType(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            (status, e.to_string()).into_response()
        }
    }
}
