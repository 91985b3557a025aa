//! The order record.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::{Money, OrderStatus, PartId, PaymentMethod, TransactionId};

/// Payment details recorded when an order is paid.
///
/// Method and transaction id are stored together, so an order either has
/// both or neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub transaction_id: TransactionId,
}

/// A customer order tracked from creation to completion or cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner_id: UserId,
    /// Parts included in the order, in request order, without duplicates.
    pub line_item_ids: Vec<PartId>,
    /// Sum of catalog prices at creation time. Never recomputed.
    pub total_price: Money,
    pub status: OrderStatus,
    pub payment: Option<PaymentDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Returns the payment method, if the order was paid.
    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment.as_ref().map(|p| p.method)
    }

    /// Returns the payment-side transaction id, if the order was paid.
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.payment.as_ref().map(|p| &p.transaction_id)
    }

    /// Returns the number of line items.
    pub fn line_item_count(&self) -> usize {
        self.line_item_ids.len()
    }
}
