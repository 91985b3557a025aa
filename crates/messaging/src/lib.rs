//! Event transport for order integration events.
//!
//! - [`EventPublisher`] / [`EventSubscriber`] / [`MessageHandler`] seams
//! - [`InMemoryBroker`]: topic logs, consumer groups, at-least-once redelivery
//! - [`OrderPaidProducer`]: typed sender for order-paid events
//! - [`codec`]: JSON payload encoding

pub mod codec;
pub mod error;
pub mod memory;
pub mod message;
pub mod producer;
pub mod transport;

pub use error::{MessagingError, Result};
pub use memory::{DEFAULT_MAX_DELIVERY_ATTEMPTS, InMemoryBroker};
pub use message::Message;
pub use producer::{ORDER_PAID_TOPIC, OrderPaidProducer};
pub use transport::{EventPublisher, EventSubscriber, MessageHandler};
