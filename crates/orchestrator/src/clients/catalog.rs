//! Part catalog client trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use domain::{Part, PartId, PartsFilter};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by the part catalog.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to the part catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Lists the parts matching `filter` in one batched lookup.
    ///
    /// Unknown ids are silently absent from the result.
    async fn list_parts(&self, filter: PartsFilter) -> Result<Vec<Part>, CatalogError>;
}

/// In-memory catalog for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogClient {
    parts: Arc<RwLock<HashMap<PartId, Part>>>,
    fail_on_list: Arc<AtomicBool>,
    list_calls: Arc<AtomicUsize>,
}

impl InMemoryCatalogClient {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog seeded with `parts`.
    pub fn with_parts(parts: impl IntoIterator<Item = Part>) -> Self {
        let parts = parts.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            parts: Arc::new(RwLock::new(parts)),
            ..Self::default()
        }
    }

    /// Inserts or replaces a part.
    pub async fn upsert(&self, part: Part) {
        self.parts.write().await.insert(part.id.clone(), part);
    }

    /// Configures the catalog to fail lookups until reset.
    pub fn set_fail_on_list(&self, fail: bool) {
        self.fail_on_list.store(fail, Ordering::SeqCst);
    }

    /// Returns how many lookups have been made.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalogClient {
    async fn list_parts(&self, filter: PartsFilter) -> Result<Vec<Part>, CatalogError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_on_list.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("catalog lookup failed".to_string()));
        }

        let parts = self.parts.read().await;
        if filter.ids.is_empty() {
            return Ok(parts.values().cloned().collect());
        }
        Ok(filter
            .ids
            .iter()
            .filter_map(|id| parts.get(id))
            .filter(|part| filter.matches(part))
            .cloned()
            .collect())
    }
}
