//! Catalog and payment client traits with in-memory implementations.

pub mod catalog;
pub mod payment;

pub use catalog::{CatalogClient, CatalogError, InMemoryCatalogClient};
pub use payment::{Charge, InMemoryPaymentClient, PaymentClient, PaymentError};
