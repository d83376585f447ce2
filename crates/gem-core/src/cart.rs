//! # Cart
//!
//! The shopper's cart as an explicit value. Handlers load it from a
//! [`CartStore`], mutate it, and save it back; nothing holds cart state
//! globally.

use crate::error::{PaymentError, PaymentResult};
use crate::order::LineItem;
use crate::product::{Currency, Price, PricingType, Product, ProductVariant};
use crate::variant::derived_display;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Largest quantity a single cart line may hold
pub const MAX_LINE_QUANTITY: u32 = 10_000;

/// A shopper's cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    pub currency: Currency,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Create an empty cart
    pub fn new(id: impl Into<String>, currency: Currency) -> Self {
        Self {
            id: id.into(),
            currency,
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Add `quantity` of a variant, merging with an existing line.
    pub fn add_variant(
        &mut self,
        product: &Product,
        variant: &ProductVariant,
        quantity: u32,
    ) -> PaymentResult<()> {
        if quantity == 0 {
            return Err(PaymentError::InvalidQuantity {
                message: "quantity must be at least 1".to_string(),
            });
        }
        if !variant.is_purchasable() {
            return Err(PaymentError::VariantUnavailable {
                variant_id: variant.id.clone(),
            });
        }

        let display = derived_display(variant, &product.name);
        if display.price.currency != self.currency {
            return Err(PaymentError::CurrencyMismatch {
                expected: self.currency.to_string(),
                found: display.price.currency.to_string(),
            });
        }

        let existing = self
            .items
            .iter()
            .find(|i| i.variant_id == variant.id)
            .map(|i| i.quantity)
            .unwrap_or(0);
        let requested = existing
            .checked_add(quantity)
            .filter(|q| *q <= MAX_LINE_QUANTITY)
            .ok_or_else(|| PaymentError::InvalidQuantity {
                message: format!("at most {} of one item per order", MAX_LINE_QUANTITY),
            })?;

        check_quantity(variant, requested)?;

        match self.items.iter_mut().find(|i| i.variant_id == variant.id) {
            Some(line) => line.quantity = requested,
            None => self.items.push(LineItem {
                product_id: product.id.clone(),
                variant_id: variant.id.clone(),
                name: display.name,
                unit_price: display.price,
                quantity,
                unit_label: variant.unit_label.clone(),
            }),
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a line; returns whether anything was removed
    pub fn remove(&mut self, variant_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.variant_id != variant_id);
        let removed = self.items.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.updated_at = Utc::now();
    }

    /// Calculate cart total
    pub fn total(&self) -> Price {
        Price::from_cents(
            self.items
                .iter()
                .fold(0i64, |acc, i| acc.saturating_add(i.total().amount)),
            self.currency,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, i| acc.saturating_add(i.quantity))
    }
}

fn check_quantity(variant: &ProductVariant, requested: u32) -> PaymentResult<()> {
    if variant.pricing_type == PricingType::PerUnit {
        if let Some(min) = variant.min_quantity {
            if requested < min {
                return Err(PaymentError::InvalidQuantity {
                    message: format!("minimum order for {} is {}", variant.id, min),
                });
            }
        }
        if let Some(max) = variant.max_quantity {
            if requested > max {
                return Err(PaymentError::InvalidQuantity {
                    message: format!("maximum order for {} is {}", variant.id, max),
                });
            }
        }
    }

    if variant.track_inventory
        && !variant.allow_backorder
        && i64::from(requested) > variant.stock_quantity
    {
        return Err(PaymentError::InsufficientStock {
            variant_id: variant.id.clone(),
            requested,
            available: variant.stock_quantity,
        });
    }
    Ok(())
}

/// Cart persistence
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Load a cart, or an empty one if none is stored under `cart_id`
    async fn load(&self, cart_id: &str) -> PaymentResult<Cart>;

    async fn save(&self, cart: &Cart) -> PaymentResult<()>;

    async fn clear(&self, cart_id: &str) -> PaymentResult<()>;
}

/// Process-local cart store
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    currency: Currency,
    carts: RwLock<HashMap<String, Cart>>,
}

impl InMemoryCartStore {
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            carts: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn load(&self, cart_id: &str) -> PaymentResult<Cart> {
        let carts = self
            .carts
            .read()
            .map_err(|_| PaymentError::Store("cart store lock poisoned".to_string()))?;
        Ok(carts
            .get(cart_id)
            .cloned()
            .unwrap_or_else(|| Cart::new(cart_id, self.currency)))
    }

    async fn save(&self, cart: &Cart) -> PaymentResult<()> {
        let mut carts = self
            .carts
            .write()
            .map_err(|_| PaymentError::Store("cart store lock poisoned".to_string()))?;
        carts.insert(cart.id.clone(), cart.clone());
        Ok(())
    }

    async fn clear(&self, cart_id: &str) -> PaymentResult<()> {
        let mut carts = self
            .carts
            .write()
            .map_err(|_| PaymentError::Store("cart store lock poisoned".to_string()))?;
        carts.remove(cart_id);
        Ok(())
    }
}
