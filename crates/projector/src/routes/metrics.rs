//! Prometheus metrics endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use outbox::OutboxStore;

pub struct MetricsState {
    pub handle: PrometheusHandle,
    pub outbox: Arc<dyn OutboxStore>,
}

/// GET /metrics: refreshes the outbox backlog gauge, then renders every
/// metric in the Prometheus text format.
pub async fn get(State(state): State<Arc<MetricsState>>) -> impl IntoResponse {
    match state.outbox.pending_count().await {
        Ok(pending) => metrics::gauge!("projector_outbox_pending").set(pending as f64),
        Err(e) => tracing::warn!(error = %e, "could not refresh outbox backlog"),
    }

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.handle.render(),
    )
}
