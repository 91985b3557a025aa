//! Orchestrator error taxonomy.

use common::{ContextError, OrderId};
use domain::{OrderStatus, PartId};
use messaging::MessagingError;
use order_store::StoreError;
use thiserror::Error;

use crate::clients::{CatalogError, PaymentError};

/// Errors returned by [`OrderOrchestrator`](crate::OrderOrchestrator) operations.
///
/// Guard violations get their own variants. Collaborator failures pass
/// through unchanged in the wrapping variants.
#[derive(Debug, Error)]
pub enum OrderError {
    /// CreateOrder was called without any part ids.
    #[error("order must contain at least one part")]
    NoParts,

    /// One or more requested parts are unknown to the catalog.
    #[error("parts not found: {}", join_ids(.missing))]
    PartsNotFound { missing: Vec<PartId> },

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order cannot be cancelled in its current status.
    #[error("order {order_id} is {status} and cannot be cancelled")]
    OrderConflict {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// The order cannot be paid in its current status.
    #[error("order {order_id} is {status} and cannot be paid")]
    PaymentConflict {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// Stored status is unrecognized (read or cancel path).
    #[error("order {order_id} has unrecognized status {value:?}")]
    OrderInternal { order_id: OrderId, value: String },

    /// Stored status is unrecognized (payment path).
    #[error("order {order_id} cannot be paid: unrecognized status {value:?}")]
    PaymentInternal { order_id: OrderId, value: String },

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Order store error: {0}")]
    Store(#[source] StoreError),

    #[error("Publish error: {0}")]
    Publish(#[from] MessagingError),

    #[error("{0}")]
    Context(#[from] ContextError),

    /// The post-payment task panicked or was aborted by the runtime.
    #[error("post-payment task failed: {0}")]
    PostPayment(#[from] tokio::task::JoinError),
}

impl OrderError {
    /// Returns true if the request lost against the current order status,
    /// either at the guard or at the store's conditional write.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            OrderError::OrderConflict { .. }
                | OrderError::PaymentConflict { .. }
                | OrderError::Store(StoreError::StatusConflict { .. })
        )
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OrderNotFound(order_id) => OrderError::OrderNotFound(order_id),
            other => OrderError::Store(other),
        }
    }
}

fn join_ids(ids: &[PartId]) -> String {
    ids.iter()
        .map(PartId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience type alias for orchestrator results.
pub type Result<T> = std::result::Result<T, OrderError>;
