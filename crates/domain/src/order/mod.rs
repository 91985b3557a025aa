//! Order record, status state machine and related value objects.

mod events;
mod model;
mod state;
mod value_objects;

pub use events::{FulfillmentCompletedEvent, OrderPaidEvent};
pub use model::{Order, PaymentDetails};
pub use state::OrderStatus;
pub use value_objects::{Money, PartId, PaymentMethod, TransactionId};
