use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session state
        .route("/session", get(handlers::get_snapshot))
        .route("/session/events", get(handlers::session_events))
        .route("/session/reset", post(handlers::reset))
        // Input
        .route("/session/url", post(handlers::submit_url))
        .route("/session/query", post(handlers::submit_query))
        .route("/session/draft", post(handlers::set_draft))
        // Voice
        .route("/session/dictate", post(handlers::dictate))
        .route("/session/dictate/stop", post(handlers::stop_dictation))
        .route("/session/voice", post(handlers::set_voice))
        // Query history
        .route("/history", get(handlers::get_history))
        .route("/history/toggle", post(handlers::toggle_history))
        // Request logging; the presentation layer may be served from another origin
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
