use domain::OrderStatus;
use thiserror::Error;

use crate::OrderId;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No order exists with the given id.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A conditional update found the order in a different status.
    #[error("Status conflict for order {order_id}: expected {expected}, found {actual}")]
    StatusConflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// The persisted status is not one of the known order statuses.
    #[error("Order {order_id} has unrecognized stored status {value:?}")]
    UnknownStatus { order_id: OrderId, value: String },

    /// The persisted payment method is not one of the supported methods.
    #[error("Order {order_id} has unrecognized stored payment method {value:?}")]
    UnknownPaymentMethod { order_id: OrderId, value: String },

    /// The backing store could not serve the request.
    #[error("Order store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
