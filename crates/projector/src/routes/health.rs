//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub worker_id: String,
    /// Events still waiting in the outbox; absent when the outbox is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_events: Option<u64>,
}

/// GET /health: reports dispatcher status and the outbox backlog.
///
/// Answers 503 while shutting down or when the outbox cannot be queried.
pub async fn check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let worker_id = state.worker_id.clone();

    if state.shutdown.is_cancelled() {
        let body = HealthResponse {
            status: "shutting_down",
            worker_id,
            pending_events: None,
        };
        return (StatusCode::SERVICE_UNAVAILABLE, Json(body));
    }

    match state.outbox.pending_count().await {
        Ok(pending) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                worker_id,
                pending_events: Some(pending),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check could not reach the outbox");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    worker_id,
                    pending_events: None,
                }),
            )
        }
    }
}
