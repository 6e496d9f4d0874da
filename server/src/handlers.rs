//! HTTP request handlers.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response}
};
use chrono::{DateTime, Utc};
use feed::CycleReport;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Generation of the visible snapshot, zero before the first publish.
    pub generation: u64,
    pub items: usize,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cycle: Option<CycleReport>
}

/// GET `<endpoint>`
///
/// Returns every item of the visible snapshot as a JSON array ordered by id.
/// Never waits on an in-progress refresh.
pub async fn list_items(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.cache.current_snapshot();
    tracing::debug!(
        generation = snapshot.generation(),
        items = snapshot.len(),
        "Serving snapshot"
    );
    Json(snapshot.sorted_items()).into_response()
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.cache.current_snapshot();
    let status = if snapshot.generation() == 0 {
        "starting"
    } else {
        "healthy"
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            generation: snapshot.generation(),
            items: snapshot.len(),
            published_at: snapshot.published_at(),
            last_cycle: state.scheduler.last_report().await
        })
    )
}

/// GET /metrics
///
/// Returns Prometheus-format metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| ServerError::Unavailable("metrics recorder not installed".to_string()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render()
    )
        .into_response())
}
