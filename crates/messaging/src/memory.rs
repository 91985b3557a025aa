use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{EventPublisher, EventSubscriber, Message, MessageHandler, MessagingError, Result};

/// Attempts before a record is dead-lettered, unless configured otherwise.
pub const DEFAULT_MAX_DELIVERY_ATTEMPTS: u32 = 5;

/// Pending deliveries for one consumer group. Members share the receiver.
#[derive(Clone)]
struct GroupQueue {
    tx: mpsc::UnboundedSender<Message>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Message>>>,
}

#[derive(Default)]
struct Topic {
    log: Vec<Message>,
    groups: HashMap<String, GroupQueue>,
    dead_letters: Vec<Message>,
}

/// In-process broker with topic logs and consumer groups.
///
/// Every group sees every record of a topic; a group joining late starts from
/// the earliest offset. Members of one group compete, so each record goes to
/// exactly one of them. A failed delivery is queued again with its attempt
/// counter incremented until `max_delivery_attempts`, then dead-lettered.
#[derive(Clone)]
pub struct InMemoryBroker {
    topics: Arc<RwLock<HashMap<String, Topic>>>,
    max_delivery_attempts: u32,
    fail_on_publish: Arc<AtomicBool>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    /// Creates a broker with the default redelivery budget.
    pub fn new() -> Self {
        Self::with_max_delivery_attempts(DEFAULT_MAX_DELIVERY_ATTEMPTS)
    }

    /// Creates a broker that dead-letters a record after `attempts` failed deliveries.
    pub fn with_max_delivery_attempts(attempts: u32) -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            max_delivery_attempts: attempts.max(1),
            fail_on_publish: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn max_delivery_attempts(&self) -> u32 {
        self.max_delivery_attempts
    }

    /// Makes subsequent sends fail with `Unavailable` until reset.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.fail_on_publish.store(fail, Ordering::SeqCst);
    }

    /// Returns every record appended to `topic`, in offset order.
    pub async fn published(&self, topic: &str) -> Vec<Message> {
        self.topics
            .read()
            .await
            .get(topic)
            .map(|t| t.log.clone())
            .unwrap_or_default()
    }

    /// Returns the records of `topic` that exhausted their delivery attempts.
    pub async fn dead_letters(&self, topic: &str) -> Vec<Message> {
        self.topics
            .read()
            .await
            .get(topic)
            .map(|t| t.dead_letters.clone())
            .unwrap_or_default()
    }

    async fn join_group(&self, topic: &str, group: &str) -> GroupQueue {
        let mut topics = self.topics.write().await;
        let state = topics.entry(topic.to_string()).or_default();

        if let Some(queue) = state.groups.get(group) {
            return queue.clone();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for message in &state.log {
            // The receiver is owned below, so this cannot fail.
            let _ = tx.send(message.clone());
        }
        let queue = GroupQueue {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        };
        state.groups.insert(group.to_string(), queue.clone());
        tracing::debug!(topic, group, backlog = state.log.len(), "consumer group created");
        queue
    }

    async fn deliver(
        &self,
        queue: &GroupQueue,
        group: &str,
        handler: &dyn MessageHandler,
        message: Message,
    ) {
        let result = handler.handle(&message).await;
        let topic = message.topic.clone();

        match result {
            Ok(()) => {
                tracing::trace!(
                    topic = %topic,
                    group,
                    offset = message.offset,
                    delivery_attempt = message.delivery_attempt,
                    "message handled"
                );
            }
            Err(err) if message.delivery_attempt < self.max_delivery_attempts => {
                tracing::warn!(
                    topic = %topic,
                    group,
                    offset = message.offset,
                    delivery_attempt = message.delivery_attempt,
                    error = %err,
                    "handler failed, scheduling redelivery"
                );
                metrics::counter!("messages_redelivered_total", "topic" => topic.clone())
                    .increment(1);
                if queue.tx.send(message.redelivery()).is_err() {
                    tracing::error!(topic = %topic, group, "consumer group queue closed");
                }
            }
            Err(err) => {
                tracing::error!(
                    topic = %topic,
                    group,
                    offset = message.offset,
                    delivery_attempt = message.delivery_attempt,
                    error = %err,
                    "delivery attempts exhausted, dead-lettering message"
                );
                metrics::counter!("messages_dead_lettered_total", "topic" => topic.clone())
                    .increment(1);
                self.topics
                    .write()
                    .await
                    .entry(topic)
                    .or_default()
                    .dead_letters
                    .push(message);
            }
        }
    }
}

#[async_trait]
impl EventPublisher for InMemoryBroker {
    async fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<()> {
        if self.fail_on_publish.load(Ordering::SeqCst) {
            return Err(MessagingError::Unavailable(
                "injected publish failure".to_string(),
            ));
        }

        let mut topics = self.topics.write().await;
        let state = topics.entry(topic.to_string()).or_default();
        let message = Message {
            topic: topic.to_string(),
            key: key.to_string(),
            payload,
            offset: state.log.len() as u64,
            delivery_attempt: 1,
        };

        for (group, queue) in &state.groups {
            if queue.tx.send(message.clone()).is_err() {
                tracing::error!(topic, group = %group, "consumer group queue closed");
            }
        }
        tracing::debug!(topic, key, offset = message.offset, "message published");
        state.log.push(message);

        metrics::counter!("messages_published_total", "topic" => topic.to_string()).increment(1);
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for InMemoryBroker {
    #[tracing::instrument(skip(self, handler, shutdown))]
    async fn consume(
        &self,
        topic: &str,
        group: &str,
        handler: Arc<dyn MessageHandler>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let queue = self.join_group(topic, group).await;
        tracing::info!("consumer started");

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                message = async { queue.rx.lock().await.recv().await } => message,
            };
            let Some(message) = next else { break };

            self.deliver(&queue, group, handler.as_ref(), message).await;
        }

        tracing::info!("consumer stopped");
        Ok(())
    }
}
