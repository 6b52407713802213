//! Axum router for the stub backend.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::StubState;

/// Build the stub router.
///
/// CORS allows any origin so a browser page on another port can use the
/// stub during local development.
pub fn build_router(state: Arc<StubState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ad", get(handlers::get_ad))
        .route("/api/impression", post(handlers::post_impression))
        .route("/api/click", get(handlers::get_click))
        .route("/api/requests", get(handlers::list_requests))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
