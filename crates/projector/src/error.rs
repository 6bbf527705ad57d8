//! Start-up errors of the projector process.

use thiserror::Error;

/// Anything that stops the process from coming up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to install Prometheus recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StartupError>;
