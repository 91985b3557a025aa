//! Catalog parts as seen by the order service.

use serde::{Deserialize, Serialize};

use crate::order::{Money, PartId};

/// A part record returned by the catalog. Read-only to the order service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub name: String,
    pub price: Money,
    pub stock_quantity: i64,
}

impl Part {
    /// Creates a part record.
    pub fn new(
        id: impl Into<PartId>,
        name: impl Into<String>,
        price: Money,
        stock_quantity: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock_quantity,
        }
    }

    /// Returns true if the catalog reports stock on hand.
    pub fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}

/// Filter for catalog part lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartsFilter {
    /// Part ids to fetch. Empty means no id restriction.
    pub ids: Vec<PartId>,
}

impl PartsFilter {
    /// Creates a filter selecting the given ids.
    pub fn by_ids(ids: impl IntoIterator<Item = PartId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Returns true if the part passes this filter.
    pub fn matches(&self, part: &Part) -> bool {
        self.ids.is_empty() || self.ids.contains(&part.id)
    }
}
