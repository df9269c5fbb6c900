//! Product catalog.
//!
//! Read-only from the HTTP side: products are loaded at startup (see
//! `CATALOG_FILE` in [`config`](crate::config)) and listed or fetched by id.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub category: String,
    pub price_cents: u64,
    pub stock: u32,
    /// Where the storefront fetches the product picture from, if anywhere.
    pub image_url: Option<String>,
}

/// A product as it appears in a catalog file, before it has an id.
#[derive(Clone, Debug, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub price_cents: u64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Every product, by ascending id.
    async fn list(&self) -> Result<Vec<Product>, CatalogError>;

    async fn find(&self, id: u64) -> Result<Option<Product>, CatalogError>;
}

/// In-process [`Catalog`]; ids are assigned in load order starting at 1.
#[derive(Default)]
pub struct MemoryCatalog {
    products: RwLock<BTreeMap<u64, Product>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = NewProduct>) -> Self {
        let products = products
            .into_iter()
            .zip(1..)
            .map(|(p, id)| {
                let product = Product {
                    id,
                    name: p.name,
                    category: p.category,
                    price_cents: p.price_cents,
                    stock: p.stock,
                    image_url: p.image_url,
                };
                (id, product)
            })
            .collect();
        Self { products: RwLock::new(products) }
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.read().values().cloned().collect())
    }

    async fn find(&self, id: u64) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.read().get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beans(name: &str, price_cents: u64) -> NewProduct {
        NewProduct { name: name.into(), category: "beans".into(), price_cents, stock: 10, image_url: None }
    }

    #[tokio::test]
    async fn ids_follow_load_order() {
        let catalog = MemoryCatalog::with_products([beans("Arabica", 1800), beans("Robusta", 1200)]);
        let names: Vec<_> = catalog.list().await.unwrap().into_iter().map(|p| (p.id, p.name)).collect();
        assert_eq!(names, [(1, "Arabica".to_owned()), (2, "Robusta".to_owned())]);
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let catalog = MemoryCatalog::with_products([beans("Arabica", 1800)]);
        assert_eq!(catalog.find(1).await.unwrap().map(|p| p.price_cents), Some(1800));
        assert_eq!(catalog.find(2).await.unwrap(), None);
    }

    #[test]
    fn catalog_file_entries_default_optional_fields() {
        let p: NewProduct = serde_json::from_str(r#"{"name":"Decaf","price_cents":900}"#).unwrap();
        assert_eq!((p.stock, p.category.as_str(), p.image_url), (0, "", None));
    }
}
