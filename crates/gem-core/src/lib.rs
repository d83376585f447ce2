//! # gem-core
//!
//! Core types and traits for the gemcart jewelry storefront.
//!
//! This crate provides:
//! - `Product`, `ProductVariant` and `ProductCatalog` for the catalog
//! - `VariantResolver` for turning option selections into variants
//! - `Cart` and `CartStore` for the shopper's cart
//! - `CheckoutService` for the hosted-payment checkout flow
//! - `PaymentStrategy` trait for implementing payment providers
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use gem_core::{Selection, CheckoutService, CheckoutRequest};
//!
//! // Resolve the shopper's choice
//! let selection = Selection::new().with("Metal", "Gold").with("Size", "6");
//! let variant = product.resolver().resolve(&selection);
//!
//! // Start checkout and redirect to the approval URL
//! let state = service.begin_checkout(request).await?;
//! ```

pub mod cart;
pub mod checkout;
pub mod error;
pub mod order;
pub mod product;
pub mod settings;
pub mod store;
pub mod strategy;
pub mod variant;

// Re-exports for convenience
pub use cart::{Cart, CartStore, InMemoryCartStore, MAX_LINE_QUANTITY};
pub use checkout::{CheckoutRequest, CheckoutService, CheckoutState};
pub use error::{PaymentError, PaymentResult};
pub use order::{CustomerDetails, LineItem, NewOrder, Order, OrderStatus, ShippingAddress};
pub use product::{
    Currency, Price, PricingType, Product, ProductCatalog, ProductOption, ProductOptionValue,
    ProductVariant, SelectedOption,
};
pub use settings::{
    CheckoutSettings, InMemorySettings, ProviderCredentials, ProviderMode, SettingsStore,
};
pub use store::{InMemoryOrderStore, OrderStore};
pub use strategy::{
    BoxedPaymentStrategy, CaptureResult, CheckoutUrls, PaymentStrategy, PaymentStrategySelector,
    ProviderOrder, ProviderOrderItem, ProviderOrderRequest,
};
pub use variant::{
    derived_display, duplicate_combinations, DuplicateCombination, OptionAvailability, Selection,
    StockLabel, ValueAvailability, VariantDisplay, VariantResolver,
};
