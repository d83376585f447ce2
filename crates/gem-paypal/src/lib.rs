//! # gem-paypal
//!
//! PayPal payment strategy for gemcart, built on the Orders v2 REST API.
//!
//! The shopper is redirected to PayPal's hosted approval page and the order
//! is captured when they return to the storefront's success page.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gem_core::{PaymentStrategySelector, CheckoutService};
//! use gem_paypal::PayPalStrategy;
//! use std::sync::Arc;
//!
//! let strategies = PaymentStrategySelector::new()
//!     .with_strategy(Arc::new(PayPalStrategy::from_env()));
//!
//! let service = CheckoutService::new(settings, orders, carts, strategies, urls);
//! let state = service.begin_checkout(request).await?;
//! // Redirect the shopper to the approval URL in `state`
//! ```

pub mod checkout;
pub mod config;

// Re-exports
pub use checkout::PayPalStrategy;
pub use config::{PayPalConfig, LIVE_API_BASE_URL, SANDBOX_API_BASE_URL};
