use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Create the HTTP router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Credential management
        .route("/auth/token", post(handlers::set_token))
        .route("/auth/token", delete(handlers::clear_token))
        // Recording control
        .route("/record/start", post(handlers::start_recording))
        .route("/record/stop", post(handlers::stop_recording))
        // Session pipeline
        .route("/session/status", get(handlers::session_status))
        .route("/session/transcribe", post(handlers::transcribe))
        .route("/session/process", post(handlers::process_session))
        // Session history
        .route("/history", get(handlers::history))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
