//! Order domain model.
//!
//! [`OrderItem`] and [`Order`] validate themselves on construction, so holding
//! a value of either type means every field already passed its rule. Absent
//! inputs are resolved at the boundary (request DTOs) to the zero value of the
//! field, which then fails the same check as an explicit zero or blank.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OrderError — every rule an order or one of its items can violate.
///
/// Validation stops at the first violated rule, so exactly one variant is
/// reported per failed construction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("Restaurant ID cannot be null and must be greater than zero")]
    InvalidRestaurantId,
    #[error("Customer ID cannot be null and must be greater than zero")]
    InvalidCustomerId,
    #[error("Delivery address cannot be null or empty")]
    InvalidDeliveryAddress,
    #[error("Order items cannot be null or empty")]
    EmptyOrderItems,
    #[error("Menu item ID cannot be null and must be greater than zero")]
    InvalidMenuItemId,
    #[error("Menu item name cannot be null or empty")]
    InvalidMenuItemName,
    #[error("Price cannot be null and must be greater than zero")]
    InvalidPrice,
    #[error("Quantity cannot be null and must be greater than zero")]
    InvalidQuantity,
    /// A line total or the order total does not fit in a decimal.
    #[error("Order amount exceeds the supported price range")]
    PriceOverflow,
    /// Only `CREATED -> OUT_FOR_DELIVERY` is allowed.
    #[error("Order status can only be updated from CREATED to OUT_FOR_DELIVERY (current: {current})")]
    InvalidStatusTransition { current: OrderStatus },
}

/// OrderStatus — lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Pending,
    Confirmed,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Storage and wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored status name is not one of the known states.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown order status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(OrderStatus::Created),
            "PENDING" => Ok(OrderStatus::Pending),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "OUT_FOR_DELIVERY" => Ok(OrderStatus::OutForDelivery),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// OrderItem — one immutable, validated line of an order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    menu_item_id: i64,
    menu_item_name: String,
    unit_price: Decimal,
    quantity: i32,
}

impl OrderItem {
    /// Validates and builds a line item.
    ///
    /// Rules are checked in the order id, name, price, quantity; the first
    /// failure is returned.
    pub fn new(
        menu_item_id: i64,
        menu_item_name: impl Into<String>,
        unit_price: Decimal,
        quantity: i32,
    ) -> Result<Self, OrderError> {
        let menu_item_name = menu_item_name.into();
        if menu_item_id <= 0 {
            return Err(OrderError::InvalidMenuItemId);
        }
        if menu_item_name.trim().is_empty() {
            return Err(OrderError::InvalidMenuItemName);
        }
        if unit_price <= Decimal::ZERO {
            return Err(OrderError::InvalidPrice);
        }
        if quantity <= 0 {
            return Err(OrderError::InvalidQuantity);
        }
        if unit_price.checked_mul(Decimal::from(quantity)).is_none() {
            return Err(OrderError::PriceOverflow);
        }
        Ok(Self {
            menu_item_id,
            menu_item_name,
            unit_price,
            quantity,
        })
    }

    pub fn menu_item_id(&self) -> i64 {
        self.menu_item_id
    }

    pub fn menu_item_name(&self) -> &str {
        &self.menu_item_name
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    /// `unit_price × quantity`. Construction guarantees the product fits.
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Order — the priced aggregate of items placed by a customer at a restaurant.
///
/// Items and total are fixed at construction. The status is the only field
/// that changes afterwards, and only through [`Order::mark_out_for_delivery`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    id: Option<i64>,
    restaurant_id: i64,
    customer_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    delivery_address: Option<String>,
    total_price: Decimal,
    status: OrderStatus,
    items: Vec<OrderItem>,
}

impl Order {
    /// Builds an order without a delivery address.
    pub fn new(
        restaurant_id: i64,
        customer_id: i64,
        items: Vec<OrderItem>,
    ) -> Result<Self, OrderError> {
        Self::validated(restaurant_id, customer_id, None, items)
    }

    /// Builds an order that must carry a non-blank delivery address.
    pub fn with_delivery_address(
        restaurant_id: i64,
        customer_id: i64,
        delivery_address: impl Into<String>,
        items: Vec<OrderItem>,
    ) -> Result<Self, OrderError> {
        Self::validated(
            restaurant_id,
            customer_id,
            Some(delivery_address.into()),
            items,
        )
    }

    fn validated(
        restaurant_id: i64,
        customer_id: i64,
        delivery_address: Option<String>,
        items: Vec<OrderItem>,
    ) -> Result<Self, OrderError> {
        if restaurant_id <= 0 {
            return Err(OrderError::InvalidRestaurantId);
        }
        if customer_id <= 0 {
            return Err(OrderError::InvalidCustomerId);
        }
        if let Some(address) = &delivery_address {
            if address.trim().is_empty() {
                return Err(OrderError::InvalidDeliveryAddress);
            }
        }
        if items.is_empty() {
            return Err(OrderError::EmptyOrderItems);
        }
        let total_price = total_price(&items)?;

        Ok(Self {
            id: None,
            restaurant_id,
            customer_id,
            delivery_address,
            total_price,
            status: OrderStatus::Created,
            items,
        })
    }

    /// Rebuilds a persisted order.
    ///
    /// Used by stores when loading rows; the total is recomputed from the
    /// items rather than trusted from storage, so it can still overflow.
    pub fn restore(
        id: i64,
        restaurant_id: i64,
        customer_id: i64,
        delivery_address: Option<String>,
        status: OrderStatus,
        items: Vec<OrderItem>,
    ) -> Result<Self, OrderError> {
        Ok(Self {
            id: Some(id),
            restaurant_id,
            customer_id,
            delivery_address,
            total_price: total_price(&items)?,
            status,
            items,
        })
    }

    /// Returns the same order carrying the identity assigned by a store.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Advances `CREATED -> OUT_FOR_DELIVERY`.
    pub fn mark_out_for_delivery(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Created {
            return Err(OrderError::InvalidStatusTransition {
                current: self.status,
            });
        }
        self.status = OrderStatus::OutForDelivery;
        Ok(())
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn restaurant_id(&self) -> i64 {
        self.restaurant_id
    }

    pub fn customer_id(&self) -> i64 {
        self.customer_id
    }

    pub fn delivery_address(&self) -> Option<&str> {
        self.delivery_address.as_deref()
    }

    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }
}

fn total_price(items: &[OrderItem]) -> Result<Decimal, OrderError> {
    items.iter().try_fold(Decimal::ZERO, |total, item| {
        total
            .checked_add(item.line_total())
            .ok_or(OrderError::PriceOverflow)
    })
}
