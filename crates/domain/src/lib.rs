//! Domain layer for the order orchestration service.
//!
//! This crate provides the core domain types:
//! - `Order` record and its `OrderStatus` state machine
//! - value objects (`Money`, `PartId`, `PaymentMethod`, `TransactionId`)
//! - catalog `Part` records and lookup filters
//! - integration event payloads exchanged with fulfillment

pub mod error;
pub mod order;
pub mod part;

pub use common::{EventId, OrderId, UserId};
pub use error::DomainError;
pub use order::{
    FulfillmentCompletedEvent, Money, Order, OrderPaidEvent, OrderStatus, PartId, PaymentDetails,
    PaymentMethod, TransactionId,
};
pub use part::{Part, PartsFilter};
