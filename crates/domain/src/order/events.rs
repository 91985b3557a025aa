//! Integration events exchanged with the fulfillment pipeline.

use common::{EventId, OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::{PaymentMethod, TransactionId};

/// Published after an order is paid; triggers fulfillment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    /// Freshly generated for every publish.
    pub event_id: EventId,
    pub order_id: OrderId,
    pub owner_id: UserId,
    pub payment_method: PaymentMethod,
    pub transaction_id: TransactionId,
}

impl OrderPaidEvent {
    /// Builds an event with a new event id.
    pub fn new(
        order_id: OrderId,
        owner_id: UserId,
        payment_method: PaymentMethod,
        transaction_id: TransactionId,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            owner_id,
            payment_method,
            transaction_id,
        }
    }
}

/// Emitted by the fulfillment pipeline once an order has been fulfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentCompletedEvent {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub owner_id: UserId,
    pub fulfillment_duration_seconds: i64,
}
