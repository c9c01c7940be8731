//! In-process order store.
//!
//! Keeps orders in a map behind a mutex and mimics the batch semantics of the
//! real database: a batch is validated in full before anything is written, and
//! `updatedAt` comes from the store's clock at commit time. Used for local
//! dry runs against a seed file and as the fake store in tests.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;

use super::{BatchUpdate, CommitResult, OrderQuery, OrderStore, StoreError};
use crate::error::SweeperError;
use crate::order::Order;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    orders: Mutex<BTreeMap<String, Order>>,
    fail_next_query: Mutex<Option<String>>,
    fail_next_commit: Mutex<Option<String>>,
    queries: AtomicUsize,
    commits: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let store = Self::new();
        for order in orders {
            store.insert(order);
        }
        store
    }

    /// Load a JSON array of orders, the same shape `order-sweeper run --seed`
    /// prints back after a sweep.
    pub fn from_json_file(path: &Path) -> Result<Self, SweeperError> {
        let contents = std::fs::read_to_string(path)?;
        let orders: Vec<Order> = serde_json::from_str(&contents)?;
        Ok(Self::from_orders(orders))
    }

    pub fn insert(&self, order: Order) {
        let mut orders = self.orders.lock().unwrap_or_else(|e| e.into_inner());
        orders.insert(order.id.clone(), order);
    }

    pub fn get(&self, id: &str) -> Option<Order> {
        let orders = self.orders.lock().unwrap_or_else(|e| e.into_inner());
        orders.get(id).cloned()
    }

    /// All orders, sorted by id.
    pub fn snapshot(&self) -> Vec<Order> {
        let orders = self.orders.lock().unwrap_or_else(|e| e.into_inner());
        orders.values().cloned().collect()
    }

    /// Make the next query fail with [`StoreError::Unavailable`].
    pub fn fail_next_query(&self, message: impl Into<String>) {
        *self.fail_next_query.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.into());
    }

    /// Make the next commit fail with [`StoreError::Unavailable`] without
    /// applying any of its writes.
    pub fn fail_next_commit(&self, message: impl Into<String>) {
        *self.fail_next_commit.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.into());
    }

    /// Number of queries served, including failed ones.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of batches successfully applied.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl OrderStore for InMemoryStore {
    async fn query(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self
            .fail_next_query
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            return Err(StoreError::Unavailable(message));
        }

        let orders = self.orders.lock().unwrap_or_else(|e| e.into_inner());
        let matches = orders
            .values()
            .filter(|order| order.status == query.status)
            .filter(|order| match query.delivered_before {
                None => true,
                Some(cutoff) => order
                    .delivered_at
                    .as_ref()
                    .and_then(|d| d.resolve())
                    .is_some_and(|ts| ts < cutoff),
            })
            .cloned()
            .collect();
        Ok(matches)
    }

    async fn commit(&self, batch: &BatchUpdate) -> Result<CommitResult, StoreError> {
        if let Some(message) = self
            .fail_next_commit
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            return Err(StoreError::Unavailable(message));
        }

        let mut orders = self.orders.lock().unwrap_or_else(|e| e.into_inner());

        // Validate the whole batch before touching anything.
        if let Some(missing) = batch
            .updates()
            .iter()
            .find(|u| !orders.contains_key(&u.order_id))
        {
            return Err(StoreError::Conflict(format!(
                "no order to update: {}",
                missing.order_id
            )));
        }

        let commit_time = Utc::now();
        for update in batch.updates() {
            if let Some(order) = orders.get_mut(&update.order_id) {
                order.status = update.status.clone();
                order.updated_at = Some(commit_time);
            }
        }
        self.commits.fetch_add(1, Ordering::SeqCst);

        Ok(CommitResult {
            commit_time,
            writes: batch.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{DeliveredAt, OrderStatus};
    use chrono::Duration;
    use std::io::Write;

    fn seeded() -> InMemoryStore {
        let now = Utc::now();
        InMemoryStore::from_orders([
            Order::new("old", OrderStatus::Delivered).delivered_at(now - Duration::days(10)),
            Order::new("fresh", OrderStatus::Delivered).delivered_at(now - Duration::hours(2)),
            Order::new("bad", OrderStatus::Delivered)
                .delivered_at(DeliveredAt::Malformed("n/a".into())),
            Order::new("shipped", OrderStatus::Shipped),
        ])
    }

    #[tokio::test]
    async fn query_filters_by_status() {
        let store = seeded();
        let found = store
            .query(&OrderQuery::with_status(OrderStatus::Delivered))
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["bad", "fresh", "old"]);
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn query_applies_delivered_before() {
        let store = seeded();
        let cutoff = Utc::now() - Duration::days(3);
        let found = store
            .query(&OrderQuery::with_status(OrderStatus::Delivered).delivered_before(cutoff))
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["old"]);
    }

    #[tokio::test]
    async fn commit_stamps_updated_at() {
        let store = seeded();
        let before = Utc::now();
        let mut batch = BatchUpdate::new();
        batch.set_status("old", OrderStatus::Shipped);

        let result = store.commit(&batch).await.unwrap();

        assert_eq!(result.writes, 1);
        assert!(result.commit_time >= before);
        let order = store.get("old").unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.updated_at, Some(result.commit_time));
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn commit_with_missing_order_applies_nothing() {
        let store = seeded();
        let mut batch = BatchUpdate::new();
        batch.set_status("old", OrderStatus::Shipped);
        batch.set_status("ghost", OrderStatus::Shipped);

        let err = store.commit(&batch).await.unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.get("old").unwrap().status, OrderStatus::Delivered);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let store = seeded();
        store.fail_next_query("permission denied");
        let q = OrderQuery::with_status(OrderStatus::Delivered);
        assert!(matches!(
            store.query(&q).await,
            Err(StoreError::Unavailable(msg)) if msg == "permission denied"
        ));
        assert!(store.query(&q).await.is_ok());
    }

    #[test]
    fn loads_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "A", "status": "Delivered", "deliveredAt": "2026-10-01T00:00:00Z"}},
                {{"id": "C", "status": "Shipped"}}
            ]"#
        )
        .unwrap();

        let store = InMemoryStore::from_json_file(file.path()).unwrap();

        assert_eq!(store.snapshot().len(), 2);
        assert_eq!(store.get("C").unwrap().status, OrderStatus::Shipped);
    }

    #[test]
    fn seed_file_with_numeric_delivered_at_still_loads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "A", "status": "Delivered", "deliveredAt": "2026-10-01T00:00:00Z"}},
                {{"id": "N", "status": "Delivered", "deliveredAt": 1700000000}}
            ]"#
        )
        .unwrap();

        let store = InMemoryStore::from_json_file(file.path()).unwrap();

        assert_eq!(
            store.get("N").unwrap().delivered_at,
            Some(DeliveredAt::Malformed("integer value".into()))
        );
        assert!(store.get("A").unwrap().delivered_at.unwrap().resolve().is_some());
    }
}
