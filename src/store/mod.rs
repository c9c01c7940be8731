//! Access to the document store that owns order records.
//!
//! The sweeper only needs two capabilities, captured by [`OrderStore`]: an
//! equality query on `status` (optionally bounded by `deliveredAt`), and an
//! atomic multi-document update whose `updatedAt` is assigned by the store.

pub mod error;
pub mod firestore;
pub mod memory;

use chrono::{DateTime, Utc};

use crate::order::{Order, OrderStatus};

pub use error::StoreError;
pub use firestore::FirestoreClient;
pub use memory::InMemoryStore;

/// Selection criteria for an order query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    pub status: OrderStatus,
    /// When set, only orders whose `deliveredAt` is a timestamp strictly
    /// earlier than this instant are returned.
    pub delivered_before: Option<DateTime<Utc>>,
}

impl OrderQuery {
    pub fn with_status(status: OrderStatus) -> Self {
        Self {
            status,
            delivered_before: None,
        }
    }

    pub fn delivered_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.delivered_before = Some(cutoff);
        self
    }
}

/// A single status change inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub order_id: String,
    pub status: OrderStatus,
}

/// A set of status changes applied all-or-nothing.
///
/// Every update also stamps `updatedAt` with the store's own clock at commit
/// time, and requires the order to still exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchUpdate {
    updates: Vec<StatusUpdate>,
}

impl BatchUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&mut self, order_id: impl Into<String>, status: OrderStatus) {
        self.updates.push(StatusUpdate {
            order_id: order_id.into(),
            status,
        });
    }

    pub fn updates(&self) -> &[StatusUpdate] {
        &self.updates
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// What the store reports back after a successful batch commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitResult {
    /// Server time at which the batch was applied; also the `updatedAt` value.
    pub commit_time: DateTime<Utc>,
    pub writes: usize,
}

/// Abstraction over the document store so the sweep can run against the
/// real database or an in-memory fake.
#[allow(async_fn_in_trait)]
pub trait OrderStore {
    /// Fetch every order matching `query`.
    async fn query(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError>;

    /// Apply `batch` atomically. On error no order has been modified.
    async fn commit(&self, batch: &BatchUpdate) -> Result<CommitResult, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_collects_updates_in_order() {
        let mut batch = BatchUpdate::new();
        assert!(batch.is_empty());
        batch.set_status("a", OrderStatus::Shipped);
        batch.set_status("b", OrderStatus::Shipped);
        assert_eq!(batch.len(), 2);
        let ids: Vec<_> = batch.updates().iter().map(|u| u.order_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn query_builder_sets_cutoff() {
        let cutoff = Utc::now();
        let q = OrderQuery::with_status(OrderStatus::Delivered).delivered_before(cutoff);
        assert_eq!(q.status, OrderStatus::Delivered);
        assert_eq!(q.delivered_before, Some(cutoff));
    }
}
