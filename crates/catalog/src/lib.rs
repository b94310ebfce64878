//! Menu catalog lookup.
//!
//! The order workflow never trusts caller-supplied names or prices; it asks a
//! [`MenuCatalog`] for the authoritative values of every requested item.
//! [`HttpMenuCatalog`] talks to the restaurant catalog service over HTTP.

use std::sync::Arc;
use std::time::Duration;

use app_config::AppConfig;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Authoritative catalog data for one menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub price: Decimal,
}

/// Ways a catalog lookup can fail.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The request never produced a response (connect, timeout, TLS...).
    #[error("Catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The catalog answered with a non-success status.
    #[error("Catalog returned status {status} for {url}")]
    Status { status: u16, url: String },
    /// The response body is not a menu item.
    #[error("Malformed catalog response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Resolves `(restaurant, menu item)` pairs to their catalog name and price.
#[async_trait]
pub trait MenuCatalog: Send + Sync {
    async fn resolve(&self, restaurant_id: i64, menu_item_id: i64)
    -> Result<MenuItem, CatalogError>;
}

#[async_trait]
impl<T: MenuCatalog + ?Sized> MenuCatalog for Arc<T> {
    async fn resolve(
        &self,
        restaurant_id: i64,
        menu_item_id: i64,
    ) -> Result<MenuItem, CatalogError> {
        (**self).resolve(restaurant_id, menu_item_id).await
    }
}

/// [`MenuCatalog`] backed by the catalog service's REST API.
#[derive(Debug, Clone)]
pub struct HttpMenuCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMenuCatalog {
    /// Creates a client rooted at `base_url` (e.g. `http://localhost:8080/catalog/restaurants`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, CatalogError> {
        Self::new(cfg.catalog_base_url.clone(), cfg.catalog_timeout)
    }

    fn menu_item_url(&self, restaurant_id: i64, menu_item_id: i64) -> String {
        format!(
            "{}/{}/menuItems/{}",
            self.base_url, restaurant_id, menu_item_id
        )
    }
}

#[async_trait]
impl MenuCatalog for HttpMenuCatalog {
    async fn resolve(
        &self,
        restaurant_id: i64,
        menu_item_id: i64,
    ) -> Result<MenuItem, CatalogError> {
        let url = self.menu_item_url(restaurant_id, menu_item_id);
        debug!(%url, "fetching menu item from catalog");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
