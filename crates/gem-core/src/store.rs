//! # Order Store
//!
//! Persistence seam for orders. The storefront only ever creates an order,
//! records the provider's references and updates its status; everything else
//! about orders is back-office work.

use crate::error::{PaymentError, PaymentResult};
use crate::order::{NewOrder, Order, OrderStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

/// Order persistence
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order and return it with its generated ID
    async fn create(&self, order: NewOrder) -> PaymentResult<Order>;

    /// Set an order's status. Single-row update, no locking beyond that.
    async fn update_status(&self, order_id: &str, status: OrderStatus) -> PaymentResult<()>;

    /// Remember the provider's order ID for reconciliation by hand
    async fn set_provider_order(&self, order_id: &str, provider_order_id: &str) -> PaymentResult<()>;

    /// Mark an order paid: status `processing` and the capture ID, in one write
    async fn record_capture(&self, order_id: &str, capture_id: Option<&str>) -> PaymentResult<()>;

    async fn get(&self, order_id: &str) -> PaymentResult<Option<Order>>;
}

/// Process-local order store
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn modify<F>(&self, order_id: &str, f: F) -> PaymentResult<()>
    where
        F: FnOnce(&mut Order),
    {
        let mut orders = self
            .orders
            .write()
            .map_err(|_| PaymentError::Store("order store lock poisoned".to_string()))?;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| PaymentError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        f(order);
        order.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> PaymentResult<Order> {
        let order = Order::from_new(order);
        let mut orders = self
            .orders
            .write()
            .map_err(|_| PaymentError::Store("order store lock poisoned".to_string()))?;
        orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> PaymentResult<()> {
        self.modify(order_id, |order| order.status = status)
    }

    async fn set_provider_order(&self, order_id: &str, provider_order_id: &str) -> PaymentResult<()> {
        self.modify(order_id, |order| {
            order.provider_order_id = Some(provider_order_id.to_string())
        })
    }

    async fn record_capture(&self, order_id: &str, capture_id: Option<&str>) -> PaymentResult<()> {
        self.modify(order_id, |order| {
            order.status = OrderStatus::Processing;
            order.capture_id = capture_id.map(String::from);
        })
    }

    async fn get(&self, order_id: &str) -> PaymentResult<Option<Order>> {
        let orders = self
            .orders
            .read()
            .map_err(|_| PaymentError::Store("order store lock poisoned".to_string()))?;
        Ok(orders.get(order_id).cloned())
    }
}
