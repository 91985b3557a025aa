use domain::OrderPaidEvent;

use crate::{EventPublisher, Result, codec};

/// Default topic for order-paid events.
pub const ORDER_PAID_TOPIC: &str = "order-paid";

/// Encodes order-paid events and sends them keyed by order id.
#[derive(Clone)]
pub struct OrderPaidProducer<P: EventPublisher> {
    publisher: P,
    topic: String,
}

impl<P: EventPublisher> OrderPaidProducer<P> {
    pub fn new(publisher: P) -> Self {
        Self::with_topic(publisher, ORDER_PAID_TOPIC)
    }

    pub fn with_topic(publisher: P, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Sends the event; resolves once the broker has accepted it.
    #[tracing::instrument(
        skip(self, event),
        fields(topic = %self.topic, order_id = %event.order_id, event_id = %event.event_id)
    )]
    pub async fn publish(&self, event: &OrderPaidEvent) -> Result<()> {
        let payload = codec::encode(event)?;
        self.publisher
            .send(&self.topic, &event.order_id.to_string(), payload)
            .await?;
        tracing::debug!("order paid event published");
        Ok(())
    }
}
