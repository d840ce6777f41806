use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::middleware::{assign_request_id, request_span};
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Scoring
        .route("/api/v1/score", post(handlers::score))
        // Profiles
        .route("/api/v1/profiles", post(handlers::refresh_profile))
        .route("/api/v1/profiles/:media_type/:key", get(handlers::get_profile))
        // Recommendations
        .route("/api/v1/recommendations", post(handlers::recommendations))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(assign_request_id))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
