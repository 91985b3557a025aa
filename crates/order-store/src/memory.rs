use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use domain::{Order, OrderStatus};
use tokio::sync::RwLock;

use crate::{
    OrderId, Result, StoreError,
    store::{NewOrder, OrderRow, OrderStore, OrderUpdate, UpdateOptions, decode_status},
};

/// In-memory order store implementation for testing and local runs.
///
/// Rows are kept in their persisted text form, like the PostgreSQL
/// implementation, and every update happens under one write lock so
/// conditional updates are atomic.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    rows: Arc<RwLock<HashMap<OrderId, OrderRow>>>,
    fail_on_update: Arc<AtomicBool>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Clears all orders.
    pub async fn clear(&self) {
        self.rows.write().await.clear();
    }

    /// Makes subsequent updates fail with `Unavailable` until reset.
    pub fn set_fail_on_update(&self, fail: bool) {
        self.fail_on_update.store(fail, Ordering::SeqCst);
    }

    /// Overwrites the stored status text of an order, bypassing validation.
    ///
    /// Returns false if the order does not exist.
    pub async fn write_raw_status(&self, order_id: OrderId, raw: &str) -> bool {
        match self.rows.write().await.get_mut(&order_id) {
            Some(row) => {
                row.status = raw.to_string();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<OrderId> {
        let order_id = OrderId::new();
        let row = OrderRow {
            id: order_id,
            owner_id: order.owner_id,
            part_ids: order
                .line_item_ids
                .iter()
                .map(|id| id.as_str().to_string())
                .collect(),
            total_price_cents: order.total_price.cents(),
            status: OrderStatus::PendingPayment.as_str().to_string(),
            payment_method: None,
            transaction_id: None,
            created_at: Utc::now(),
            updated_at: None,
        };

        self.rows.write().await.insert(order_id, row);
        tracing::debug!(%order_id, "order row inserted");

        Ok(order_id)
    }

    async fn get(&self, order_id: OrderId) -> Result<Order> {
        let rows = self.rows.read().await;
        let row = rows
            .get(&order_id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(order_id))?;
        row.into_order()
    }

    async fn update(
        &self,
        order_id: OrderId,
        update: OrderUpdate,
        options: UpdateOptions,
    ) -> Result<()> {
        if self.fail_on_update.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected update failure".to_string()));
        }

        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;

        // Check expected status if specified
        if let Some(expected) = options.expected_status {
            let actual = decode_status(order_id, &row.status)?;
            if actual != expected {
                metrics::counter!("order_store_status_conflicts_total").increment(1);
                return Err(StoreError::StatusConflict {
                    order_id,
                    expected,
                    actual,
                });
            }
        }

        if let Some(status) = update.status {
            row.status = status.as_str().to_string();
        }
        if let Some(payment) = update.payment {
            row.payment_method = Some(payment.method.as_str().to_string());
            row.transaction_id = Some(payment.transaction_id.as_str().to_string());
        }
        row.updated_at = Some(Utc::now());

        Ok(())
    }
}
