//! Payload decoding errors.

use thiserror::Error;

/// A payload that can never be applied, no matter how often it is retried.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The JSON does not match the schema registered for the event type.
    #[error("Malformed {event_type} payload: {source}")]
    Malformed {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },

    /// The JSON parsed but violates a rule of the event type.
    #[error("Invalid {event_type} payload: {reason}")]
    Invalid { event_type: String, reason: String },
}

impl DecodeError {
    /// Returns the event type whose payload failed to decode.
    pub fn event_type(&self) -> &str {
        match self {
            DecodeError::Malformed { event_type, .. } | DecodeError::Invalid { event_type, .. } => {
                event_type
            }
        }
    }
}
