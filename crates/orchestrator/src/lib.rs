//! Order lifecycle orchestration.
//!
//! [`OrderOrchestrator`] composes four collaborators behind traits:
//! - [`CatalogClient`] resolves parts and prices at creation time
//! - [`PaymentClient`] charges the owner
//! - [`OrderStore`](order_store::OrderStore) persists orders and arbitrates
//!   concurrent writes with conditional updates
//! - [`OrderPaidProducer`](messaging::OrderPaidProducer) announces payments
//!
//! [`FulfillmentCompletedHandler`] closes the loop when fulfillment reports
//! back through a consumer group.

pub mod clients;
pub mod completion;
pub mod error;
pub mod orchestrator;

pub use clients::{
    CatalogClient, CatalogError, Charge, InMemoryCatalogClient, InMemoryPaymentClient,
    PaymentClient, PaymentError,
};
pub use completion::{FULFILLMENT_COMPLETED_TOPIC, FulfillmentCompletedHandler};
pub use error::{OrderError, Result};
pub use orchestrator::{OrderCreated, OrderOrchestrator};
