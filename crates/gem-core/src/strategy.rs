//! # Payment Strategy Trait
//!
//! Seam between checkout orchestration and a concrete payment provider.
//! Providers are registered by name in a [`PaymentStrategySelector`]; the
//! store settings pick which one a checkout uses.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentStrategy (trait)                  │
//! │  ├── create_order()    token exchange + hosted order        │
//! │  ├── capture_order()   token exchange + capture             │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                    ┌───────┴───────┐
//!                    │ PayPalStrategy│
//!                    │  (gem-paypal) │
//!                    └───────────────┘
//! ```

use crate::error::PaymentResult;
use crate::product::{Currency, Price};
use crate::settings::ProviderCredentials;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// One line as sent to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderOrderItem {
    /// Already truncated to the provider's limit
    pub name: String,
    pub quantity: u32,
    pub unit_amount: Price,
}

/// Everything a provider needs to open a hosted payment page
#[derive(Debug, Clone, Serialize)]
pub struct ProviderOrderRequest {
    /// Our order ID, echoed back by the provider
    pub reference_id: String,
    pub currency: Currency,
    pub total: Price,
    pub items: Vec<ProviderOrderItem>,
    pub return_url: String,
    pub cancel_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
}

/// Provider order awaiting shopper approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderOrder {
    pub provider_order_id: String,
    /// Hosted page to redirect the shopper to
    pub approval_url: String,
}

/// Provider's answer to a capture request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureResult {
    pub provider_order_id: String,
    /// Provider status, verbatim
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_id: Option<String>,
}

impl CaptureResult {
    /// Money has moved
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("completed")
    }
}

/// Core trait for payment provider implementations.
///
/// Credentials are passed per call because they come from the settings
/// store, which may change between checkouts.
#[async_trait]
pub trait PaymentStrategy: Send + Sync {
    /// Exchange credentials for a token and create a provider order.
    ///
    /// # Returns
    /// The provider order ID and the approval link to redirect to.
    async fn create_order(
        &self,
        credentials: &ProviderCredentials,
        request: &ProviderOrderRequest,
    ) -> PaymentResult<ProviderOrder>;

    /// Exchange credentials for a token and capture an approved order.
    ///
    /// A non-success HTTP status is an error; any status the provider reports
    /// in a successful response (including declines) comes back as `Ok`.
    async fn capture_order(
        &self,
        credentials: &ProviderCredentials,
        provider_order_id: &str,
    ) -> PaymentResult<CaptureResult>;

    /// Get the provider name (for settings lookup and logging).
    fn provider_name(&self) -> &'static str;

    /// Longest item name the provider accepts.
    fn max_item_name_len(&self) -> usize {
        127
    }
}

/// Type alias for a boxed payment strategy (dynamic dispatch)
pub type BoxedPaymentStrategy = Arc<dyn PaymentStrategy>;

/// Registry of supported providers
#[derive(Clone, Default)]
pub struct PaymentStrategySelector {
    strategies: HashMap<String, BoxedPaymentStrategy>,
}

impl PaymentStrategySelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a payment strategy
    pub fn register(&mut self, strategy: BoxedPaymentStrategy) {
        let name = strategy.provider_name().to_string();
        self.strategies.insert(name, strategy);
    }

    /// Register with builder pattern
    pub fn with_strategy(mut self, strategy: BoxedPaymentStrategy) -> Self {
        self.register(strategy);
        self
    }

    /// Get a strategy by provider name
    pub fn get(&self, provider: &str) -> Option<&BoxedPaymentStrategy> {
        self.strategies.get(provider)
    }

    /// List all registered providers
    pub fn providers(&self) -> Vec<&str> {
        self.strategies.keys().map(|s| s.as_str()).collect()
    }
}

/// Where the provider sends the shopper back to
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    /// Base URL of the storefront (e.g., "https://gemcart.shop")
    pub base_url: String,
    /// Success page path
    pub success_path: String,
    /// Cancel page path
    pub cancel_path: String,
}

impl CheckoutUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            success_path: "/checkout/success".to_string(),
            cancel_path: "/checkout/cancel".to_string(),
        }
    }

    /// Return URL; the provider appends its own `token` parameter.
    pub fn success_url(&self, order_id: &str) -> String {
        format!("{}{}?order_id={}", self.base_url, self.success_path, order_id)
    }

    pub fn cancel_url(&self, order_id: &str) -> String {
        format!("{}{}?order_id={}", self.base_url, self.cancel_path, order_id)
    }
}

impl Default for CheckoutUrls {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}
