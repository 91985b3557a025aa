//! Messaging error types.

use thiserror::Error;

/// Errors raised while publishing, decoding, or handling messages.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// Payload could not be encoded or decoded as JSON.
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The broker refused or failed to accept a message.
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    /// A message handler rejected a delivery; the broker decides on redelivery.
    #[error("Handler error: {0}")]
    Handler(String),
}

impl MessagingError {
    /// Wraps any displayable failure from a handler.
    pub fn handler(err: impl std::fmt::Display) -> Self {
        Self::Handler(err.to_string())
    }
}

/// Result type for messaging operations.
pub type Result<T> = std::result::Result<T, MessagingError>;
