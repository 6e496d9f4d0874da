//! Route definitions for the freshcve server.

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer
};

use crate::handlers;
use crate::state::AppState;

/// Creates the Axum router with all routes configured.
///
/// The read endpoint path comes from configuration and must not be
/// `/health` or `/metrics`.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Read-only public data, any origin may fetch it
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(&state.config.server.endpoint, get(handlers::list_items))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
