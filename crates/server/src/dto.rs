//! JSON request bodies.
//!
//! Every field is optional on the wire. A missing field becomes the zero value
//! of its type, so it is rejected by the same domain rule as an explicit zero
//! or blank value.

use rust_decimal::Decimal;
use serde::Deserialize;
use service::{CreateOrder, CreateOrderWithItems, NewOrderItem, RequestedItem};

/// Body of `POST /orders`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    pub restaurant_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub delivery_address: Option<String>,
    pub items: Option<Vec<RequestedItemDto>>,
}

/// A requested line. Any name or price the caller sends is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct RequestedItemDto {
    pub menu_item_id: Option<i64>,
    pub quantity: Option<i32>,
}

/// Body of `POST /orders/direct`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderWithItemsRequest {
    pub restaurant_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub delivery_address: Option<String>,
    pub items: Option<Vec<OrderItemDto>>,
}

/// A fully specified line, trusted as sent.
#[derive(Debug, Default, Deserialize)]
pub struct OrderItemDto {
    pub menu_item_id: Option<i64>,
    pub menu_item_name: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

impl From<CreateOrderRequest> for CreateOrder {
    fn from(req: CreateOrderRequest) -> Self {
        CreateOrder {
            restaurant_id: req.restaurant_id.unwrap_or_default(),
            customer_id: req.customer_id.unwrap_or_default(),
            delivery_address: req.delivery_address.unwrap_or_default(),
            items: req
                .items
                .unwrap_or_default()
                .into_iter()
                .map(|item| RequestedItem {
                    menu_item_id: item.menu_item_id.unwrap_or_default(),
                    quantity: item.quantity.unwrap_or_default(),
                })
                .collect(),
        }
    }
}

impl From<CreateOrderWithItemsRequest> for CreateOrderWithItems {
    fn from(req: CreateOrderWithItemsRequest) -> Self {
        CreateOrderWithItems {
            restaurant_id: req.restaurant_id.unwrap_or_default(),
            customer_id: req.customer_id.unwrap_or_default(),
            delivery_address: req.delivery_address,
            items: req
                .items
                .unwrap_or_default()
                .into_iter()
                .map(|item| NewOrderItem {
                    menu_item_id: item.menu_item_id.unwrap_or_default(),
                    menu_item_name: item.menu_item_name.unwrap_or_default(),
                    unit_price: item.price.unwrap_or_default(),
                    quantity: item.quantity.unwrap_or_default(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_fields_become_zero_values() {
        let req: CreateOrderRequest =
            serde_json::from_str(r#"{ "items": [ { "quantity": 2 } ] }"#).unwrap();
        let cmd = CreateOrder::from(req);
        assert_eq!(cmd.restaurant_id, 0);
        assert_eq!(cmd.customer_id, 0);
        assert_eq!(cmd.delivery_address, "");
        assert_eq!(
            cmd.items,
            vec![RequestedItem {
                menu_item_id: 0,
                quantity: 2
            }]
        );
    }

    #[test]
    fn test_caller_price_ignored_for_catalog_orders() {
        let req: CreateOrderRequest = serde_json::from_str(
            r#"{
                "restaurant_id": 1,
                "customer_id": 1,
                "delivery_address": "Nizampet, Hyderabad",
                "items": [ { "menu_item_id": 1, "menu_item_name": "Free Pizza", "price": 0.01, "quantity": 2 } ]
            }"#,
        )
        .unwrap();
        let cmd = CreateOrder::from(req);
        assert_eq!(cmd.items.len(), 1);
        assert_eq!(cmd.items[0].menu_item_id, 1);
    }

    #[test]
    fn test_direct_items_keep_caller_values() {
        let req: CreateOrderWithItemsRequest = serde_json::from_str(
            r#"{
                "restaurant_id": 1,
                "customer_id": 4,
                "items": [ { "menu_item_id": 1, "menu_item_name": "Pizza", "price": 199.0, "quantity": 2 } ]
            }"#,
        )
        .unwrap();
        let cmd = CreateOrderWithItems::from(req);
        assert_eq!(cmd.delivery_address, None);
        assert_eq!(cmd.items[0].menu_item_name, "Pizza");
        assert_eq!(cmd.items[0].unit_price, dec!(199.0));
    }
}
