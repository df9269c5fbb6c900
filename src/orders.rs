//! Orders placed by users.
//!
//! An order is priced when it is placed: each line copies the product's name
//! and unit price from the catalog at that moment, so later catalog changes
//! do not rewrite history.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("order book unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub product_id: u64,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: u64,
}

impl OrderLine {
    pub fn subtotal_cents(&self) -> u64 {
        self.unit_price_cents * u64::from(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: u64,
    pub user_id: u64,
    pub lines: Vec<OrderLine>,
    pub total_cents: u64,
    pub placed_at: DateTime<Utc>,
}

#[async_trait]
pub trait OrderBook: Send + Sync {
    /// Stores an order for `user_id`. The total is the sum of the lines.
    async fn place(&self, user_id: u64, lines: Vec<OrderLine>) -> Result<Order, OrderError>;

    /// `user_id`'s orders, oldest first.
    async fn for_user(&self, user_id: u64) -> Result<Vec<Order>, OrderError>;
}

#[derive(Default)]
pub struct MemoryOrderBook {
    orders: Mutex<BTreeMap<u64, Order>>,
}

impl MemoryOrderBook {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderBook for MemoryOrderBook {
    async fn place(&self, user_id: u64, lines: Vec<OrderLine>) -> Result<Order, OrderError> {
        let mut orders = self.orders.lock();
        let id = orders.keys().next_back().map_or(1, |last| last + 1);
        let order = Order {
            id,
            user_id,
            total_cents: lines.iter().map(OrderLine::subtotal_cents).sum(),
            lines,
            placed_at: Utc::now(),
        };
        orders.insert(id, order.clone());
        Ok(order)
    }

    async fn for_user(&self, user_id: u64) -> Result<Vec<Order>, OrderError> {
        let orders = self.orders.lock();
        Ok(orders.values().filter(|o| o.user_id == user_id).cloned().collect())
    }
}
