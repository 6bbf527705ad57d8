//! Projection error types.

use domain::DecodeError;
use outbox::OutboxError;
use thiserror::Error;

use crate::read_model::ReadModel;

/// Errors that can occur while projecting an outbox event.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An error occurred in the outbox.
    #[error("Outbox error: {0}")]
    Outbox(#[from] OutboxError),

    /// A read-model query or transaction failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The payload does not match its event type's schema.
    #[error("Event decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An update targeted rows that do not exist (yet).
    #[error("No {model} row for {target}")]
    MissingRow { model: ReadModel, target: String },

    /// A projection-specific error.
    #[error("Projection error: {0}")]
    Projection(String),
}

impl ProjectionError {
    /// Returns true when retrying the event cannot succeed.
    ///
    /// Permanent failures are dead-lettered right away; everything else is
    /// released back to the queue.
    pub fn is_permanent(&self) -> bool {
        matches!(self, ProjectionError::Decode(_))
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
