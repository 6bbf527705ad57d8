use thiserror::Error;

use crate::EventId;

/// Errors that can occur when interacting with the outbox.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// No event with this id exists in the outbox.
    #[error("Outbox event not found: {0}")]
    NotFound(EventId),

    /// The event cannot be appended as given.
    #[error("Invalid outbox event: {0}")]
    InvalidEvent(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for outbox operations.
pub type Result<T> = std::result::Result<T, OutboxError>;
