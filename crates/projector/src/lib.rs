//! Host process for the outbox projection engine.
//!
//! Runs the dispatcher as a background task and serves health and
//! Prometheus metrics over HTTP, with structured logging (tracing).

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use outbox::OutboxStore;
use projections::{Dispatcher, ReadModelStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// State shared with the HTTP handlers.
pub struct AppState {
    pub worker_id: String,
    pub outbox: Arc<dyn OutboxStore>,
    pub shutdown: CancellationToken,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_state = Arc::new(routes::metrics::MetricsState {
        handle: metrics_handle,
        outbox: Arc::clone(&state.outbox),
    });
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_state);

    Router::new()
        .route("/health", get(routes::health::check))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Runs `dispatcher` on its own task until `shutdown` is cancelled.
pub fn spawn_dispatcher<O, S>(
    dispatcher: Dispatcher<O, S>,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    O: OutboxStore + 'static,
    S: ReadModelStore + 'static,
{
    tokio::spawn(async move { dispatcher.run(shutdown).await })
}

/// Registers descriptions for the metrics the dispatcher emits.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "projector_events_dispatched",
        "Events applied to the read models and marked dispatched"
    );
    metrics::describe_counter!(
        "projector_events_failed",
        "Events whose projection failed and were released for retry"
    );
    metrics::describe_counter!(
        "projector_events_dead_lettered",
        "Events parked after a permanent failure or too many attempts"
    );
    metrics::describe_counter!(
        "projector_unknown_events",
        "Events with no registered handler"
    );
    metrics::describe_counter!(
        "projector_events_skipped",
        "Claimed events another instance had already dispatched"
    );
    metrics::describe_gauge!(
        "projector_outbox_pending",
        "Events waiting in the outbox at the last scrape"
    );
    metrics::describe_histogram!(
        "projector_tick_duration_seconds",
        metrics::Unit::Seconds,
        "Wall time of one dispatcher tick"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbox::{InMemoryOutboxStore, OutboxEvent};
    use projections::{DispatcherConfig, InMemoryReadModelStore};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn spawned_dispatcher_drains_outbox_and_stops_on_cancel() {
        let outbox = InMemoryOutboxStore::new();
        outbox
            .append(
                OutboxEvent::builder()
                    .event_type("review.created")
                    .payload_raw(serde_json::json!({"rating": 4}))
                    .build(),
            )
            .await
            .unwrap();

        let store = InMemoryReadModelStore::with_outbox(outbox.clone());
        let config = DispatcherConfig {
            poll_interval: Duration::from_millis(100),
            ..DispatcherConfig::default()
        };
        let shutdown = CancellationToken::new();
        let handle = spawn_dispatcher(
            Dispatcher::new(outbox.clone(), store, config),
            shutdown.clone(),
        );

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(outbox.pending_count().await.unwrap(), 0);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
