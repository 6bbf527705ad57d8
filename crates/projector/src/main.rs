//! Projector entry point.

use std::sync::Arc;

use outbox::PostgresOutboxStore;
use projections::{Dispatcher, PgReadModelStore};
use projector::AppState;
use projector::config::{Config, LogFormat};
use projector::error::{Result, StartupError};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM), then cancels `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }

    shutdown.cancel();
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    projector::describe_metrics();

    // 3. Connect and migrate
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    let outbox = PostgresOutboxStore::new(pool.clone());
    if config.run_migrations {
        outbox.run_migrations().await?;
        tracing::info!("migrations applied");
    }

    // 4. Start the dispatcher
    let dispatcher_config = config.dispatcher_config();
    let worker_id = dispatcher_config.worker_id.clone();
    let shutdown = CancellationToken::new();
    let dispatcher = Dispatcher::new(
        outbox.clone(),
        PgReadModelStore::new(pool.clone()),
        dispatcher_config,
    );
    let dispatcher_handle = projector::spawn_dispatcher(dispatcher, shutdown.clone());

    // 5. Build the application
    let state = Arc::new(AppState {
        worker_id,
        outbox: Arc::new(outbox),
        shutdown: shutdown.clone(),
    });
    let app = projector::create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting projector");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await;

    // The dispatcher finishes its tick in flight before stopping.
    shutdown.cancel();
    if let Err(e) = dispatcher_handle.await {
        tracing::error!(error = %e, "dispatcher task panicked");
    }
    pool.close().await;

    served?;
    tracing::info!("projector shut down gracefully");
    Ok(())
}
