//! Handler for fulfillment-completed events.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::Context;
use domain::{FulfillmentCompletedEvent, OrderStatus};
use messaging::{EventPublisher, Message, MessageHandler, MessagingError};
use order_store::OrderStore;

use crate::clients::{CatalogClient, PaymentClient};
use crate::error::OrderError;
use crate::orchestrator::OrderOrchestrator;

/// Default topic carrying fulfillment-completed events.
pub const FULFILLMENT_COMPLETED_TOPIC: &str = "fulfillment-completed";

/// Marks orders completed when fulfillment reports back.
///
/// The status is overwritten, not transitioned, so a redelivered event
/// succeeds again. An event for an unknown order is logged and acknowledged.
/// Decode and store failures are returned to the transport for redelivery.
pub struct FulfillmentCompletedHandler<S, C, P, E>
where
    S: OrderStore,
    C: CatalogClient,
    P: PaymentClient,
    E: EventPublisher,
{
    orchestrator: Arc<OrderOrchestrator<S, C, P, E>>,
    timeout: Option<Duration>,
}

impl<S, C, P, E> FulfillmentCompletedHandler<S, C, P, E>
where
    S: OrderStore + 'static,
    C: CatalogClient,
    P: PaymentClient,
    E: EventPublisher + 'static,
{
    pub fn new(orchestrator: Arc<OrderOrchestrator<S, C, P, E>>) -> Self {
        Self {
            orchestrator,
            timeout: None,
        }
    }

    /// Bounds each delivery's store update by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl<S, C, P, E> MessageHandler for FulfillmentCompletedHandler<S, C, P, E>
where
    S: OrderStore + 'static,
    C: CatalogClient,
    P: PaymentClient,
    E: EventPublisher + 'static,
{
    #[tracing::instrument(
        skip(self, message),
        fields(topic = %message.topic, offset = message.offset, delivery_attempt = message.delivery_attempt)
    )]
    async fn handle(&self, message: &Message) -> messaging::Result<()> {
        let event: FulfillmentCompletedEvent = message.decode().inspect_err(|err| {
            tracing::error!(error = %err, "failed to decode fulfillment completed event");
        })?;

        let ctx = match self.timeout {
            Some(timeout) => Context::with_timeout(timeout),
            None => Context::new(),
        };

        match self
            .orchestrator
            .update_status(&ctx, event.order_id, OrderStatus::Completed)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    order_id = %event.order_id,
                    event_id = %event.event_id,
                    fulfillment_duration_seconds = event.fulfillment_duration_seconds,
                    "order completed"
                );
                Ok(())
            }
            Err(OrderError::OrderNotFound(order_id)) => {
                tracing::warn!(%order_id, event_id = %event.event_id, "fulfillment completed for unknown order");
                Ok(())
            }
            Err(err) => {
                tracing::error!(order_id = %event.order_id, error = %err, "failed to complete order");
                Err(MessagingError::handler(err))
            }
        }
    }
}
