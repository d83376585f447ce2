//! # Order Types
//!
//! Orders as persisted by the storefront. The checkout orchestrator creates an
//! order as `pending` and moves it to `processing` once the payment provider
//! reports the capture complete; every other transition belongs to the admin
//! back-office.

use crate::product::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Customer asked about an item, nothing paid
    Inquiry,
    /// Created at checkout, awaiting payment
    Pending,
    /// Paid, being prepared
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Inquiry => "inquiry",
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inquiry" => Ok(OrderStatus::Inquiry),
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

/// Who placed the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Where the order ships
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2
    pub country: String,
}

/// A priced line in a cart or order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub variant_id: String,

    /// Display name (product name plus option values)
    pub name: String,

    /// Charged price per item or per unit
    pub unit_price: Price,

    pub quantity: u32,

    /// Unit for per-unit priced variants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_label: Option<String>,
}

impl LineItem {
    /// Calculate the total price for this line item
    pub fn total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// Fields required to create an order
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer: CustomerDetails,
    pub shipping_address: ShippingAddress,
    pub items: Vec<LineItem>,
    pub total: Price,
    pub status: OrderStatus,
    pub payment_method: String,
    /// Cart to clear once payment is captured
    pub cart_id: Option<String>,
}

/// A persisted order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer: CustomerDetails,
    pub shipping_address: ShippingAddress,
    pub items: Vec<LineItem>,
    pub total: Price,
    pub status: OrderStatus,
    pub payment_method: String,

    /// Provider's order ID once created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_order_id: Option<String>,

    /// Provider's capture ID once payment is taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a stored order with a generated ID
    pub fn from_new(new: NewOrder) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            customer: new.customer,
            shipping_address: new.shipping_address,
            items: new.items,
            total: new.total,
            status: new.status,
            payment_method: new.payment_method,
            provider_order_id: None,
            capture_id: None,
            cart_id: new.cart_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Get item count
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, i| acc.saturating_add(i.quantity))
    }
}
