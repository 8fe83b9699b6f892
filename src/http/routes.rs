use super::handlers;
use super::socket;
use super::state::AppState;
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Audio streaming
        .route("/ws", get(socket::ws_handler))
        // Session queries
        .route("/sessions", get(handlers::list_sessions))
        .route(
            "/sessions/:connection_id/status",
            get(handlers::get_session_status),
        )
        .layer(
            ServiceBuilder::new()
                // Add tracing middleware for request logging
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
