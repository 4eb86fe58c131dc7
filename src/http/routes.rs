use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session commands
        .route("/session/record/start", post(handlers::start_recording))
        .route("/session/record/stop", post(handlers::stop_recording))
        .route("/session/upload", post(handlers::upload))
        .route("/session/analyze", post(handlers::analyze))
        .route("/session/reset", post(handlers::reset))
        // Session queries
        .route("/session/status", get(handlers::get_status))
        .route("/session/audio", get(handlers::get_audio))
        // History
        .route("/history", get(handlers::get_history))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
