//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the API router with versioned endpoints
    let api_v1 = Router::new()
        // Mission lifecycle
        .route("/missions", post(handlers::create_mission))
        .route("/missions", get(handlers::list_missions))
        .route("/missions/{mission_id}", get(handlers::get_mission))
        .route("/missions/{mission_id}/start", post(handlers::start_mission))
        .route("/missions/{mission_id}/complete", post(handlers::complete_mission))
        // Frame ingestion
        .route("/frames", post(handlers::ingest_frame))
        // Alerts & review
        .route("/alerts", get(handlers::list_alerts))
        .route("/alerts/{alert_id}", get(handlers::get_alert))
        .route("/alerts/{alert_id}/review", post(handlers::review_alert))
        // Derived views
        .route("/missions/{mission_id}/episodes", get(handlers::get_episodes))
        .route("/missions/{mission_id}/report", get(handlers::get_report))
        // Background replay
        .route("/missions/{mission_id}/replay", post(handlers::start_replay))
        .route("/missions/{mission_id}/replay", get(handlers::get_replay_status))
        .route("/missions/{mission_id}/replay", delete(handlers::cancel_replay))
        .route(
            "/missions/{mission_id}/replay/logs/stream",
            get(handlers::stream_replay_logs),
        );

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::ready))
        .route("/version", get(handlers::version))
        .nest("/v1", api_v1)
        // Allow frame payloads with large detection lists.
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
