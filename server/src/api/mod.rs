//! HTTP API: routing, handlers, request/response models and error mapping.

pub mod errors;
pub mod handlers;
pub mod models;

use axum::Router;
use axum::routing::{get, post};

use crate::api::handlers::AppState;

/// Build the API router.
///
/// | method | path           |
/// |--------|----------------|
/// | POST   | `/api/status/` |
/// | POST   | `/api/query/`  |
/// | GET    | `/api/health/` |
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status/", post(handlers::status))
        .route("/api/query/", post(handlers::query))
        .route("/api/health/", get(handlers::health))
        .with_state(state)
}
