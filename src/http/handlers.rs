use super::state::AppState;
use crate::session::{ConnectionId, SessionStats};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// GET /sessions
/// Statistics for every active session
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let stats: Vec<SessionStats> = state.registry.all_stats().await;
    (StatusCode::OK, Json(stats))
}

/// GET /sessions/:connection_id/status
/// Statistics for one session
pub async fn get_session_status(
    State(state): State<AppState>,
    Path(connection_id): Path<String>,
) -> impl IntoResponse {
    let connection_id = ConnectionId::from(connection_id);

    match state.registry.stats(&connection_id).await {
        Some(stats) => (StatusCode::OK, Json(stats)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Session {} not found", connection_id),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
