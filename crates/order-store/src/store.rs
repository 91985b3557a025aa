use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Money, Order, OrderStatus, PartId, PaymentDetails, PaymentMethod, TransactionId, UserId};

use crate::{OrderId, Result, StoreError};

/// Fields of an order that does not exist yet.
///
/// The store assigns the id and creation timestamp; new orders always start
/// in `PendingPayment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub owner_id: UserId,
    pub line_item_ids: Vec<PartId>,
    pub total_price: Money,
}

/// Partial field update for an existing order.
///
/// Unset fields keep their stored value. `updated_at` is always refreshed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub payment: Option<PaymentDetails>,
}

impl OrderUpdate {
    /// Creates an update that only changes the status.
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            payment: None,
        }
    }

    /// Adds payment details to the update.
    pub fn with_payment(mut self, method: PaymentMethod, transaction_id: TransactionId) -> Self {
        self.payment = Some(PaymentDetails {
            method,
            transaction_id,
        });
        self
    }
}

/// Options for updating an order.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Status the order must currently have for the update to apply.
    /// If None, the update overwrites unconditionally.
    pub expected_status: Option<OrderStatus>,
}

impl UpdateOptions {
    /// Creates options with no status check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options requiring the order to be in `status`.
    pub fn expect_status(status: OrderStatus) -> Self {
        Self {
            expected_status: Some(status),
        }
    }
}

/// Core trait for order store implementations.
///
/// Implementations are shared by every in-flight request, so they must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order in `PendingPayment` and returns its id.
    async fn create(&self, order: NewOrder) -> Result<OrderId>;

    /// Loads an order by id.
    ///
    /// Fails with `OrderNotFound` if absent, or `UnknownStatus` if the stored
    /// status cannot be interpreted.
    async fn get(&self, order_id: OrderId) -> Result<Order>;

    /// Applies a partial update to an order as one atomic write.
    ///
    /// If `options.expected_status` is set and the stored status differs, no
    /// field is changed and the call fails with `StatusConflict`. Two
    /// concurrent conditional updates expecting the same status cannot both
    /// succeed.
    async fn update(
        &self,
        order_id: OrderId,
        update: OrderUpdate,
        options: UpdateOptions,
    ) -> Result<()>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for std::sync::Arc<T> {
    async fn create(&self, order: NewOrder) -> Result<OrderId> {
        (**self).create(order).await
    }

    async fn get(&self, order_id: OrderId) -> Result<Order> {
        (**self).get(order_id).await
    }

    async fn update(
        &self,
        order_id: OrderId,
        update: OrderUpdate,
        options: UpdateOptions,
    ) -> Result<()> {
        (**self).update(order_id, update, options).await
    }
}

/// An order row as persisted, with status and payment method as text.
#[derive(Debug, Clone)]
pub(crate) struct OrderRow {
    pub id: OrderId,
    pub owner_id: UserId,
    pub part_ids: Vec<String>,
    pub total_price_cents: i64,
    pub status: String,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    /// Interprets the row, rejecting unrecognized status or payment method text.
    pub fn into_order(self) -> Result<Order> {
        let status = decode_status(self.id, &self.status)?;

        let payment = match (self.payment_method, self.transaction_id) {
            (Some(method), Some(transaction_id)) => {
                let method = method.parse::<PaymentMethod>().map_err(|_| {
                    StoreError::UnknownPaymentMethod {
                        order_id: self.id,
                        value: method.clone(),
                    }
                })?;
                Some(PaymentDetails {
                    method,
                    transaction_id: TransactionId::new(transaction_id),
                })
            }
            _ => None,
        };

        Ok(Order {
            id: self.id,
            owner_id: self.owner_id,
            line_item_ids: self.part_ids.into_iter().map(PartId::new).collect(),
            total_price: Money::from_cents(self.total_price_cents),
            status,
            payment,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Parses a persisted status, reporting the offending order on failure.
pub(crate) fn decode_status(order_id: OrderId, raw: &str) -> Result<OrderStatus> {
    raw.parse::<OrderStatus>()
        .map_err(|_| StoreError::UnknownStatus {
            order_id,
            value: raw.to_string(),
        })
}
