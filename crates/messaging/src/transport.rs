//! Publisher, subscriber, and handler seams.
//!
//! Delivery is at-least-once: a handler may see the same record more than
//! once and must be idempotent.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{Message, Result};

/// Sends payloads to a durable topic log.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Appends a record to `topic`. Resolves once the broker has accepted it.
    async fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<()>;
}

/// Processes records delivered to a consumer group.
///
/// Returning an error asks the transport to redeliver the record.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<()>;
}

/// Delivers records from a topic to one member of a consumer group.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Joins `group` on `topic` and feeds records to `handler` until
    /// `shutdown` is cancelled.
    async fn consume(
        &self,
        topic: &str,
        group: &str,
        handler: Arc<dyn MessageHandler>,
        shutdown: CancellationToken,
    ) -> Result<()>;
}
