//! # Order persistence
//!
//! This module defines the [`OrderStore`] contract the service layer persists
//! through, a PostgreSQL implementation ([`PgOrderStore`]) and an in-memory one
//! ([`InMemoryOrderStore`]) for tests and database-less runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use deadpool_postgres::{Pool, PoolError};
use model::{Order, OrderItem, OrderStatus};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio_postgres::Row;
use tracing::debug;

mod memory;

pub use memory::InMemoryOrderStore;

/// # RepositoryError
///
/// Error types that can occur during store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database-related errors, wrapping the underlying PostgreSQL error
    #[error("Database error: {0}")]
    Db(#[from] tokio_postgres::Error),
    /// Failed to obtain a connection from the pool.
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
    /// An update targeted an order id that is not stored.
    #[error("No stored order with id {0}")]
    NotFound(i64),
    /// A stored row could not be turned back into a valid order.
    #[error("Corrupt order data: {0}")]
    Corrupt(String),
    /// An order has more items than the `position` column can index.
    #[error("Order has too many items to store: {0}")]
    TooManyItems(usize),
}

/// # OrderStore
///
/// Persistence boundary for orders.
///
/// `save` inserts an order without an id (the store assigns one) or overwrites
/// the mutable state of an order that already has one. Last writer wins.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists the order and returns it carrying its stored id.
    async fn save(&self, order: Order) -> Result<Order, RepositoryError>;

    /// Loads one order with its items, `None` if the id is unknown.
    async fn find_by_id(&self, id: i64) -> Result<Option<Order>, RepositoryError>;

    /// Loads every stored order, ordered by id.
    async fn find_all(&self) -> Result<Vec<Order>, RepositoryError>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn save(&self, order: Order) -> Result<Order, RepositoryError> {
        (**self).save(order).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Order>, RepositoryError> {
        (**self).find_by_id(id).await
    }

    async fn find_all(&self) -> Result<Vec<Order>, RepositoryError> {
        (**self).find_all().await
    }
}

/// PostgreSQL implementation of the [`OrderStore`] trait.
///
/// Orders live in `orders`, their items in `order_items` keyed by
/// `(order_id, position)` so the original item order survives a round trip.
pub struct PgOrderStore {
    pool: Pool,
}

impl PgOrderStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

const INSERT_ORDER: &str = r#"
    INSERT INTO orders (restaurant_id, customer_id, delivery_address, total_price, status)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id
"#;

const INSERT_ITEM: &str = r#"
    INSERT INTO order_items (order_id, position, menu_item_id, menu_item_name, unit_price, quantity)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

const UPDATE_ORDER: &str = r#"
    UPDATE orders SET status = $2, total_price = $3
    WHERE id = $1
"#;

const SELECT_ORDER: &str = r#"
    SELECT id, restaurant_id, customer_id, delivery_address, status
    FROM orders WHERE id = $1
"#;

const SELECT_ORDER_ITEMS: &str = r#"
    SELECT order_id, menu_item_id, menu_item_name, unit_price, quantity
    FROM order_items WHERE order_id = $1
    ORDER BY position
"#;

const SELECT_ALL_ORDERS: &str = r#"
    SELECT id, restaurant_id, customer_id, delivery_address, status
    FROM orders ORDER BY id
"#;

const SELECT_ALL_ITEMS: &str = r#"
    SELECT order_id, menu_item_id, menu_item_name, unit_price, quantity
    FROM order_items ORDER BY order_id, position
"#;

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn save(&self, order: Order) -> Result<Order, RepositoryError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let saved = match order.id() {
            None => {
                let row = tx
                    .query_one(
                        INSERT_ORDER,
                        &[
                            &order.restaurant_id(),
                            &order.customer_id(),
                            &order.delivery_address(),
                            &order.total_price(),
                            &order.status().as_str(),
                        ],
                    )
                    .await?;
                let id: i64 = row.get("id");

                for (position, item) in order.items().iter().enumerate() {
                    tx.execute(
                        INSERT_ITEM,
                        &[
                            &id,
                            &item_position(position)?,
                            &item.menu_item_id(),
                            &item.menu_item_name(),
                            &item.unit_price(),
                            &item.quantity(),
                        ],
                    )
                    .await?;
                }
                debug!(order_id = id, items = order.items().len(), "inserted order");
                order.with_id(id)
            }
            Some(id) => {
                let updated = tx
                    .execute(
                        UPDATE_ORDER,
                        &[&id, &order.status().as_str(), &order.total_price()],
                    )
                    .await?;
                if updated == 0 {
                    return Err(RepositoryError::NotFound(id));
                }
                debug!(order_id = id, status = %order.status(), "updated order");
                order
            }
        };

        tx.commit().await?;
        Ok(saved)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Order>, RepositoryError> {
        let client = self.pool.get().await?;
        let Some(row) = client.query_opt(SELECT_ORDER, &[&id]).await? else {
            return Ok(None);
        };

        let items = client
            .query(SELECT_ORDER_ITEMS, &[&id])
            .await?
            .iter()
            .map(item_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        order_from_row(&row, items).map(Some)
    }

    async fn find_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let client = self.pool.get().await?;
        let order_rows = client.query(SELECT_ALL_ORDERS, &[]).await?;
        let item_rows = client.query(SELECT_ALL_ITEMS, &[]).await?;

        let mut items_by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in &item_rows {
            items_by_order
                .entry(row.get("order_id"))
                .or_default()
                .push(item_from_row(row)?);
        }

        order_rows
            .iter()
            .map(|row| {
                let id: i64 = row.get("id");
                order_from_row(row, items_by_order.remove(&id).unwrap_or_default())
            })
            .collect()
    }
}

fn item_from_row(row: &Row) -> Result<OrderItem, RepositoryError> {
    let unit_price: Decimal = row.get("unit_price");
    OrderItem::new(
        row.get("menu_item_id"),
        row.get::<_, String>("menu_item_name"),
        unit_price,
        row.get("quantity"),
    )
    .map_err(|e| RepositoryError::Corrupt(e.to_string()))
}

fn order_from_row(row: &Row, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
    let status: String = row.get("status");
    let status: OrderStatus = status
        .parse()
        .map_err(|e: model::ParseStatusError| RepositoryError::Corrupt(e.to_string()))?;

    let id: i64 = row.get("id");
    Order::restore(
        id,
        row.get("restaurant_id"),
        row.get("customer_id"),
        row.get("delivery_address"),
        status,
        require_items(id, items)?,
    )
    .map_err(|e| RepositoryError::Corrupt(e.to_string()))
}

fn item_position(index: usize) -> Result<i32, RepositoryError> {
    i32::try_from(index).map_err(|_| RepositoryError::TooManyItems(index + 1))
}

/// Every stored order was saved with at least one item.
fn require_items(order_id: i64, items: Vec<OrderItem>) -> Result<Vec<OrderItem>, RepositoryError> {
    if items.is_empty() {
        return Err(RepositoryError::Corrupt(format!(
            "order {order_id} has no items"
        )));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_item_position_in_range() {
        assert_eq!(item_position(0).unwrap(), 0);
        assert_eq!(item_position(i32::MAX as usize).unwrap(), i32::MAX);
    }

    #[test]
    fn test_item_position_out_of_range() {
        let index = i32::MAX as usize + 1;
        assert!(matches!(
            item_position(index),
            Err(RepositoryError::TooManyItems(n)) if n == index + 1
        ));
    }

    #[test]
    fn test_order_without_items_is_corrupt() {
        match require_items(42, Vec::new()) {
            Err(RepositoryError::Corrupt(msg)) => assert_eq!(msg, "order 42 has no items"),
            other => panic!("expected corrupt error, got {other:?}"),
        }

        let item = OrderItem::new(1, "Pizza", dec!(199.0), 2).unwrap();
        assert_eq!(require_items(42, vec![item]).unwrap().len(), 1);
    }
}
