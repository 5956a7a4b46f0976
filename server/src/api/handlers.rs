//! HTTP request handlers and shared application state.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use semsearch_retrieval::SearchEngine;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::errors::ApiError;
use crate::api::models::{HealthResponse, QueryRequest, QueryResponse, StatusResponse};

/// Shared application state passed to every handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,

    /// Number of ranked documents returned per query.
    pub top_k: usize,
}

impl AppState {
    pub fn new(engine: Arc<SearchEngine>, top_k: usize) -> Self {
        Self { engine, top_k }
    }
}

/// `POST /api/status/`
///
/// Any request body is accepted and ignored.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.engine.status().await;
    Json(StatusResponse {
        num_of_indexed_items: status.indexed_documents,
        num_of_queries_in_qrels: status.judged_queries,
    })
}

/// `POST /api/query/`
pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        warn!("Rejected query body: {rejection}");
        ApiError::InvalidInput(rejection.body_text())
    })?;
    let request = QueryRequest::from_json(&body)?;

    info!("Processing query: {} - {}", request.query_id, request.query_text);

    state.engine.ensure_indexed().await?;

    let evaluation = state
        .engine
        .search_and_evaluate(&request.query_text, &request.query_id, state.top_k)
        .await?;

    info!(
        "Query {} completed: P@5={}, top doc={}",
        request.query_id,
        evaluation.precision_at_5,
        evaluation
            .ranked_ids
            .first()
            .map_or("none", String::as_str)
    );

    Ok(Json(QueryResponse {
        top_docs: evaluation.ranked_ids,
        p5: evaluation.precision_at_5,
    }))
}

/// `GET /api/health/`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}
