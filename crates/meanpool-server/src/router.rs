//! Axum router: maps URL paths to handlers.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{embeddings::create_embeddings, health::health};
use crate::state::{AppState, SharedState};

/// Request limits applied to every route.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Largest accepted request body
    pub max_payload_bytes: usize,
    /// Requests processed at once; the rest wait
    pub max_concurrency: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_payload_bytes: 10 * 1024 * 1024,
            max_concurrency: 100,
        }
    }
}

/// Build the full Axum router.
pub fn build_router(state: AppState, limits: Limits) -> Router {
    let shared: SharedState = Arc::new(state);

    let middleware = ServiceBuilder::new()
        .layer(ConcurrencyLimitLayer::new(limits.max_concurrency))
        .layer(DefaultBodyLimit::max(limits.max_payload_bytes));

    Router::new()
        .route("/v1/embeddings", post(create_embeddings))
        .route("/health", get(health))
        .layer(middleware)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
