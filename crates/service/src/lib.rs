//! Business logic layer for order management.
//!
//! This module defines the [`OrderService`] trait and its async implementation
//! [`OrderServiceImpl`]. The service validates incoming orders, prices them,
//! persists them through an [`OrderStore`] and drives the status transition.
//!
//! # Features
//! - Catalog-priced creation: names and prices come from a [`MenuCatalog`],
//!   never from the caller.
//! - Direct creation: caller-supplied names and prices, for integrations
//!   without a catalog.
//! - A single allowed status change, `CREATED -> OUT_FOR_DELIVERY`.
//! - Well-typed error handling via [`ServiceError`].

use async_trait::async_trait;
use catalog::{MenuCatalog, MenuItem};
use model::{Order, OrderError, OrderItem};
use repository::{OrderStore, RepositoryError};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// The main error type for all operations in [`OrderService`] and [`OrderServiceImpl`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The order or one of its items broke a construction or transition rule.
    #[error(transparent)]
    Order(#[from] OrderError),
    /// The catalog could not resolve a requested menu item, for whatever reason.
    #[error("Menu item with restaurant id: {restaurant_id} and menu item id: {menu_item_id} is not found")]
    MenuItemNotFound {
        restaurant_id: i64,
        menu_item_id: i64,
    },
    /// No order is stored under the given id.
    #[error("Order not found with id: {0}")]
    OrderNotFound(i64),
    /// A store operation failed.
    #[error("Database error: {0}")]
    Db(#[from] RepositoryError),
}

/// One requested line of a catalog-priced order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedItem {
    pub menu_item_id: i64,
    pub quantity: i32,
}

/// Input of [`OrderService::create_order`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOrder {
    pub restaurant_id: i64,
    pub customer_id: i64,
    pub delivery_address: String,
    pub items: Vec<RequestedItem>,
}

/// One fully specified line of a directly priced order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub menu_item_id: i64,
    pub menu_item_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Input of [`OrderService::create_order_with_items`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOrderWithItems {
    pub restaurant_id: i64,
    pub customer_id: i64,
    pub delivery_address: Option<String>,
    pub items: Vec<NewOrderItem>,
}

/// Trait describing business operations for order management.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Creates an order priced from the menu catalog.
    ///
    /// Each requested item is looked up one at a time, in request order. The
    /// order is written only after every item resolved and the aggregate
    /// validated.
    ///
    /// # Errors
    /// [`ServiceError::Order`] for any invalid field,
    /// [`ServiceError::MenuItemNotFound`] if a lookup fails,
    /// [`ServiceError::Db`] if the store fails.
    async fn create_order(&self, request: CreateOrder) -> Result<Order, ServiceError>;

    /// Creates an order from caller-supplied item names and prices, without
    /// consulting the catalog. A delivery address is optional, but must not
    /// be blank when given.
    async fn create_order_with_items(
        &self,
        request: CreateOrderWithItems,
    ) -> Result<Order, ServiceError>;

    /// Retrieves one order.
    ///
    /// # Errors
    /// [`ServiceError::OrderNotFound`] if no order has this id.
    async fn get_order_by_id(&self, order_id: i64) -> Result<Order, ServiceError>;

    /// Retrieves every stored order, possibly none.
    async fn get_all_orders(&self) -> Result<Vec<Order>, ServiceError>;

    /// Moves an order from `CREATED` to `OUT_FOR_DELIVERY` and persists it.
    ///
    /// # Errors
    /// [`ServiceError::OrderNotFound`] for an unknown id, or
    /// [`OrderError::InvalidStatusTransition`] (wrapped in [`ServiceError::Order`])
    /// when the order is in any other status. Nothing is written in either case.
    async fn update_order_status(&self, order_id: i64) -> Result<Order, ServiceError>;
}

/// Async implementation of [`OrderService`] over an order store and a menu catalog.
///
/// Both collaborators are injected, so tests can substitute in-memory versions.
pub struct OrderServiceImpl<S, C> {
    store: S,
    catalog: C,
}

impl<S, C> OrderServiceImpl<S, C>
where
    S: OrderStore,
    C: MenuCatalog,
{
    /// Constructs a new [`OrderServiceImpl`] from its store and catalog.
    pub fn new(store: S, catalog: C) -> Self {
        Self { store, catalog }
    }

    /// Looks up authoritative data for one requested item.
    ///
    /// Every catalog failure becomes [`ServiceError::MenuItemNotFound`]; the
    /// cause is only logged.
    async fn resolve_menu_item(
        &self,
        restaurant_id: i64,
        menu_item_id: i64,
    ) -> Result<MenuItem, ServiceError> {
        if menu_item_id <= 0 {
            return Err(OrderError::InvalidMenuItemId.into());
        }

        self.catalog
            .resolve(restaurant_id, menu_item_id)
            .await
            .map_err(|e| {
                warn!(restaurant_id, menu_item_id, error = %e, "menu item lookup failed");
                ServiceError::MenuItemNotFound {
                    restaurant_id,
                    menu_item_id,
                }
            })
    }
}

#[async_trait]
impl<S, C> OrderService for OrderServiceImpl<S, C>
where
    S: OrderStore,
    C: MenuCatalog,
{
    #[instrument(skip(self, request), fields(restaurant_id = request.restaurant_id, items = request.items.len()))]
    async fn create_order(&self, request: CreateOrder) -> Result<Order, ServiceError> {
        // Checked up front so an obviously bad request costs no catalog calls.
        if request.restaurant_id <= 0 {
            return Err(OrderError::InvalidRestaurantId.into());
        }
        if request.items.is_empty() {
            return Err(OrderError::EmptyOrderItems.into());
        }

        let mut items = Vec::with_capacity(request.items.len());
        for requested in &request.items {
            let menu_item = self
                .resolve_menu_item(request.restaurant_id, requested.menu_item_id)
                .await?;
            items.push(OrderItem::new(
                requested.menu_item_id,
                menu_item.name,
                menu_item.price,
                requested.quantity,
            )?);
        }

        let order = Order::with_delivery_address(
            request.restaurant_id,
            request.customer_id,
            request.delivery_address,
            items,
        )?;
        let saved = self.store.save(order).await?;

        info!(order_id = ?saved.id(), total_price = %saved.total_price(), "order created");
        Ok(saved)
    }

    #[instrument(skip(self, request), fields(restaurant_id = request.restaurant_id, items = request.items.len()))]
    async fn create_order_with_items(
        &self,
        request: CreateOrderWithItems,
    ) -> Result<Order, ServiceError> {
        let items = request
            .items
            .into_iter()
            .map(|item| {
                OrderItem::new(
                    item.menu_item_id,
                    item.menu_item_name,
                    item.unit_price,
                    item.quantity,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let order = match request.delivery_address {
            Some(address) => Order::with_delivery_address(
                request.restaurant_id,
                request.customer_id,
                address,
                items,
            )?,
            None => Order::new(request.restaurant_id, request.customer_id, items)?,
        };
        let saved = self.store.save(order).await?;

        info!(order_id = ?saved.id(), total_price = %saved.total_price(), "order created");
        Ok(saved)
    }

    #[instrument(skip(self))]
    async fn get_order_by_id(&self, order_id: i64) -> Result<Order, ServiceError> {
        self.store
            .find_by_id(order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound(order_id))
    }

    #[instrument(skip(self))]
    async fn get_all_orders(&self) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.find_all().await?)
    }

    #[instrument(skip(self))]
    async fn update_order_status(&self, order_id: i64) -> Result<Order, ServiceError> {
        let mut order = self.get_order_by_id(order_id).await?;
        order.mark_out_for_delivery()?;
        let saved = self.store.save(order).await?;

        info!(order_id, status = %saved.status(), "order status updated");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::CatalogError;
    use model::OrderStatus;
    use repository::InMemoryOrderStore;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Catalog answering from a fixed table and recording every lookup.
    struct ScriptedCatalog {
        items: HashMap<(i64, i64), MenuItem>,
        lookups: Mutex<Vec<(i64, i64)>>,
    }

    impl ScriptedCatalog {
        fn with_pizza_and_burger() -> Self {
            let mut items = HashMap::new();
            items.insert(
                (1, 1),
                MenuItem {
                    id: Some(1),
                    name: "Pizza".into(),
                    price: dec!(199.0),
                },
            );
            items.insert(
                (1, 2),
                MenuItem {
                    id: Some(2),
                    name: "Burger".into(),
                    price: dec!(99.0),
                },
            );
            Self {
                items,
                lookups: Mutex::new(Vec::new()),
            }
        }

        fn lookups(&self) -> Vec<(i64, i64)> {
            self.lookups.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MenuCatalog for ScriptedCatalog {
        async fn resolve(
            &self,
            restaurant_id: i64,
            menu_item_id: i64,
        ) -> Result<MenuItem, CatalogError> {
            self.lookups
                .lock()
                .unwrap()
                .push((restaurant_id, menu_item_id));
            self.items
                .get(&(restaurant_id, menu_item_id))
                .cloned()
                .ok_or_else(|| CatalogError::Status {
                    status: 404,
                    url: format!("/{restaurant_id}/menuItems/{menu_item_id}"),
                })
        }
    }

    /// In-memory store that counts writes.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryOrderStore,
        saves: AtomicUsize,
    }

    impl CountingStore {
        fn saves(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OrderStore for CountingStore {
        async fn save(&self, order: Order) -> Result<Order, RepositoryError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.inner.save(order).await
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<Order>, RepositoryError> {
            self.inner.find_by_id(id).await
        }

        async fn find_all(&self) -> Result<Vec<Order>, RepositoryError> {
            self.inner.find_all().await
        }
    }

    type TestService = OrderServiceImpl<Arc<CountingStore>, Arc<ScriptedCatalog>>;

    fn setup() -> (TestService, Arc<CountingStore>, Arc<ScriptedCatalog>) {
        let store = Arc::new(CountingStore::default());
        let catalog = Arc::new(ScriptedCatalog::with_pizza_and_burger());
        let service = OrderServiceImpl::new(store.clone(), catalog.clone());
        (service, store, catalog)
    }

    fn pizza_and_burger_request() -> CreateOrder {
        CreateOrder {
            restaurant_id: 1,
            customer_id: 1,
            delivery_address: "Nizampet, Hyderabad".into(),
            items: vec![
                RequestedItem {
                    menu_item_id: 1,
                    quantity: 2,
                },
                RequestedItem {
                    menu_item_id: 2,
                    quantity: 1,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_create_order_prices_from_catalog() {
        let (service, store, catalog) = setup();

        let order = service
            .create_order(pizza_and_burger_request())
            .await
            .unwrap();

        assert_eq!(order.id(), Some(1));
        assert_eq!(order.status(), OrderStatus::Created);
        assert_eq!(order.total_price(), dec!(497.0));
        assert_eq!(order.items()[0].menu_item_name(), "Pizza");
        assert_eq!(order.items()[1].unit_price(), dec!(99.0));
        assert_eq!(catalog.lookups(), vec![(1, 1), (1, 2)]);
        assert_eq!(store.saves(), 1);
    }

    #[tokio::test]
    async fn test_create_order_rejects_before_lookup() {
        let (service, store, catalog) = setup();

        let mut request = pizza_and_burger_request();
        request.restaurant_id = 0;
        let err = service.create_order(request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Order(OrderError::InvalidRestaurantId)));
        assert_eq!(
            err.to_string(),
            "Restaurant ID cannot be null and must be greater than zero"
        );

        let mut request = pizza_and_burger_request();
        request.items.clear();
        let err = service.create_order(request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Order(OrderError::EmptyOrderItems)));

        assert!(catalog.lookups().is_empty());
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn test_create_order_unknown_menu_item() {
        let (service, store, catalog) = setup();

        let mut request = pizza_and_burger_request();
        request.items = vec![
            RequestedItem {
                menu_item_id: 10,
                quantity: 2,
            },
            RequestedItem {
                menu_item_id: 1,
                quantity: 1,
            },
        ];
        let err = service.create_order(request).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::MenuItemNotFound {
                restaurant_id: 1,
                menu_item_id: 10
            }
        ));
        assert_eq!(
            err.to_string(),
            "Menu item with restaurant id: 1 and menu item id: 10 is not found"
        );
        // Aborted on the first failure: the second item was never looked up.
        assert_eq!(catalog.lookups(), vec![(1, 10)]);
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn test_create_order_invalid_item_fields() {
        let (service, store, catalog) = setup();

        let mut request = pizza_and_burger_request();
        request.items[1].menu_item_id = -4;
        let err = service.create_order(request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Order(OrderError::InvalidMenuItemId)));
        assert_eq!(catalog.lookups(), vec![(1, 1)]);

        let mut request = pizza_and_burger_request();
        request.items[0].quantity = 0;
        let err = service.create_order(request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Order(OrderError::InvalidQuantity)));

        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn test_create_order_invalid_order_fields() {
        let (service, store, _) = setup();

        let mut request = pizza_and_burger_request();
        request.customer_id = -1;
        let err = service.create_order(request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Order(OrderError::InvalidCustomerId)));

        let mut request = pizza_and_burger_request();
        request.delivery_address = "   ".into();
        let err = service.create_order(request).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Order(OrderError::InvalidDeliveryAddress)
        ));
        assert_eq!(err.to_string(), "Delivery address cannot be null or empty");

        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn test_create_order_with_items() {
        let (service, store, catalog) = setup();

        let order = service
            .create_order_with_items(CreateOrderWithItems {
                restaurant_id: 3,
                customer_id: 9,
                delivery_address: None,
                items: vec![
                    NewOrderItem {
                        menu_item_id: 1,
                        menu_item_name: "Pizza".into(),
                        unit_price: dec!(199.0),
                        quantity: 2,
                    },
                    NewOrderItem {
                        menu_item_id: 2,
                        menu_item_name: "Burger".into(),
                        unit_price: dec!(99.0),
                        quantity: 1,
                    },
                ],
            })
            .await
            .unwrap();

        assert_eq!(order.total_price(), dec!(497.0));
        assert_eq!(order.delivery_address(), None);
        assert!(catalog.lookups().is_empty());
        assert_eq!(store.saves(), 1);
    }

    #[tokio::test]
    async fn test_create_order_with_items_validation() {
        let (service, store, _) = setup();

        let request = CreateOrderWithItems {
            restaurant_id: 3,
            customer_id: 9,
            delivery_address: Some(String::new()),
            items: vec![NewOrderItem {
                menu_item_id: 1,
                menu_item_name: "Pizza".into(),
                unit_price: dec!(199.0),
                quantity: 2,
            }],
        };
        let err = service
            .create_order_with_items(request.clone())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Order(OrderError::InvalidDeliveryAddress)
        ));

        let mut bad_price = request.clone();
        bad_price.delivery_address = None;
        bad_price.items[0].unit_price = Decimal::ZERO;
        let err = service.create_order_with_items(bad_price).await.unwrap_err();
        assert!(matches!(err, ServiceError::Order(OrderError::InvalidPrice)));

        let mut no_items = request;
        no_items.delivery_address = None;
        no_items.items.clear();
        let err = service.create_order_with_items(no_items).await.unwrap_err();
        assert!(matches!(err, ServiceError::Order(OrderError::EmptyOrderItems)));

        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn test_get_orders() {
        let (service, _, _) = setup();
        assert!(service.get_all_orders().await.unwrap().is_empty());

        service
            .create_order(pizza_and_burger_request())
            .await
            .unwrap();
        let mut second = pizza_and_burger_request();
        second.customer_id = 2;
        service.create_order(second).await.unwrap();

        let orders = service.get_all_orders().await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1].customer_id(), 2);

        let order = service.get_order_by_id(1).await.unwrap();
        assert_eq!(order.customer_id(), 1);

        let err = service.get_order_by_id(99).await.unwrap_err();
        assert!(matches!(err, ServiceError::OrderNotFound(99)));
        assert_eq!(err.to_string(), "Order not found with id: 99");
    }

    #[tokio::test]
    async fn test_update_order_status_once() {
        let (service, store, _) = setup();
        let created = service
            .create_order(pizza_and_burger_request())
            .await
            .unwrap();
        let id = created.id().unwrap();

        let updated = service.update_order_status(id).await.unwrap();
        assert_eq!(updated.status(), OrderStatus::OutForDelivery);
        assert_eq!(store.saves(), 2);

        let err = service.update_order_status(id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Order(OrderError::InvalidStatusTransition {
                current: OrderStatus::OutForDelivery
            })
        ));
        assert_eq!(store.saves(), 2);

        let stored = service.get_order_by_id(id).await.unwrap();
        assert_eq!(stored.status(), OrderStatus::OutForDelivery);
    }

    #[tokio::test]
    async fn test_update_order_status_unknown_id() {
        let (service, store, _) = setup();

        let err = service.update_order_status(5).await.unwrap_err();
        assert!(matches!(err, ServiceError::OrderNotFound(5)));
        assert_eq!(store.saves(), 0);
    }
}
