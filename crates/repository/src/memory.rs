//! In-memory order store with thread-safe access.

use std::collections::BTreeMap;

use async_trait::async_trait;
use model::Order;
use tokio::sync::RwLock;

use crate::{OrderStore, RepositoryError};

/// Thread-safe in-memory [`OrderStore`]. Ids are assigned from 1 upwards.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    inner: RwLock<Orders>,
}

#[derive(Debug, Default)]
struct Orders {
    by_id: BTreeMap<i64, Order>,
    last_id: i64,
}

impl InMemoryOrderStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn save(&self, order: Order) -> Result<Order, RepositoryError> {
        let mut orders = self.inner.write().await;
        let id = match order.id() {
            Some(id) if !orders.by_id.contains_key(&id) => {
                return Err(RepositoryError::NotFound(id));
            }
            Some(id) => id,
            None => {
                orders.last_id += 1;
                orders.last_id
            }
        };

        let order = order.with_id(id);
        orders.by_id.insert(id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Order>, RepositoryError> {
        let orders = self.inner.read().await;
        Ok(orders.by_id.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.inner.read().await;
        Ok(orders.by_id.values().cloned().collect())
    }
}
