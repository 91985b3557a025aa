//! Shared types for the order orchestration service.

pub mod context;
pub mod types;

pub use context::{Context, ContextError};
pub use types::{EventId, OrderId, UserId};
