//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use crate::handlers::ai::{ai_analyze, ai_chat};
use crate::handlers::health::health;
use crate::handlers::upload::upload_video;
use crate::handlers::video::{analyze_video, chat_video};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;
use crate::ws::ws_events;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Inline-protocol routes (bytes travel inside the generation request)
    let video_routes = Router::new()
        .route("/video/upload", post(upload_video))
        .route("/video/analyze", post(analyze_video))
        .route("/video/chat", post(chat_video));

    // Remote-protocol routes (provider file store + state polling)
    let ai_routes = Router::new()
        .route("/ai/analyze", post(ai_analyze))
        .route("/ai/chat", post(ai_chat));

    let api_routes = Router::new().merge(video_routes).merge(ai_routes);

    let ws_routes = Router::new().route("/ws", get(ws_events));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let uploads_dir = state.store.root().to_path_buf();

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Uploaded videos are served back to the client player directly
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
