//! Domain error types.

use thiserror::Error;

/// Errors raised while interpreting domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A status string does not name any known order status.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    /// A payment method string does not name any supported method.
    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),
}
