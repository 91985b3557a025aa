//! Payment client trait and in-memory implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{PaymentMethod, TransactionId};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors raised by the payment provider.
#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("payment declined: {0}")]
    Declined(String),

    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
}

/// Charges users for orders.
#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Charges `user_id` for `order_id` and returns the provider's transaction id.
    async fn pay_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
        method: PaymentMethod,
    ) -> Result<TransactionId, PaymentError>;
}

/// A charge accepted by [`InMemoryPaymentClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charge {
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub order_id: OrderId,
    pub method: PaymentMethod,
}

/// In-memory payment provider for tests and local runs.
///
/// Transaction ids are random UUIDs. An optional latency is applied before
/// the charge is recorded, so a call aborted during it charges nothing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentClient {
    charges: Arc<RwLock<Vec<Charge>>>,
    fail_on_charge: Arc<AtomicBool>,
    latency: Option<Duration>,
}

impl InMemoryPaymentClient {
    /// Creates a new in-memory payment client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every charge by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Configures the client to decline charges until reset.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.fail_on_charge.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of accepted charges.
    pub async fn charge_count(&self) -> usize {
        self.charges.read().await.len()
    }

    /// Returns the accepted charges for one order.
    pub async fn charges_for(&self, order_id: OrderId) -> Vec<Charge> {
        self.charges
            .read()
            .await
            .iter()
            .filter(|c| c.order_id == order_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PaymentClient for InMemoryPaymentClient {
    async fn pay_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
        method: PaymentMethod,
    ) -> Result<TransactionId, PaymentError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.fail_on_charge.load(Ordering::SeqCst) {
            return Err(PaymentError::Declined("card declined".to_string()));
        }

        let transaction_id = TransactionId::new(Uuid::new_v4().to_string());
        self.charges.write().await.push(Charge {
            transaction_id: transaction_id.clone(),
            user_id,
            order_id,
            method,
        });

        Ok(transaction_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_charge_records_transaction() {
        let client = InMemoryPaymentClient::new();
        let order_id = OrderId::new();
        let user_id = UserId::new();

        let tx = client
            .pay_order(user_id, order_id, PaymentMethod::Card)
            .await
            .unwrap();

        assert!(Uuid::parse_str(tx.as_str()).is_ok());
        let charges = client.charges_for(order_id).await;
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].transaction_id, tx);
        assert_eq!(charges[0].user_id, user_id);
        assert_eq!(charges[0].method, PaymentMethod::Card);
    }

    #[tokio::test]
    async fn test_fail_on_charge() {
        let client = InMemoryPaymentClient::new();
        client.set_fail_on_charge(true);

        let result = client
            .pay_order(UserId::new(), OrderId::new(), PaymentMethod::Sbp)
            .await;
        assert!(matches!(result, Err(PaymentError::Declined(_))));
        assert_eq!(client.charge_count().await, 0);
    }

    #[tokio::test]
    async fn test_transaction_ids_are_unique() {
        let client = InMemoryPaymentClient::new();
        let order_id = OrderId::new();
        let a = client
            .pay_order(UserId::new(), order_id, PaymentMethod::Card)
            .await
            .unwrap();
        let b = client
            .pay_order(UserId::new(), order_id, PaymentMethod::Card)
            .await
            .unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_delays_charge() {
        let client = InMemoryPaymentClient::new().with_latency(Duration::from_secs(2));
        let started = tokio::time::Instant::now();

        client
            .pay_order(UserId::new(), OrderId::new(), PaymentMethod::CreditCard)
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
