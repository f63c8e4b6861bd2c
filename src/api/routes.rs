use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{health_check, info, not_found, AppState};

pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/info", get(not_found))
        .route("/info/{*slug}", get(info))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
