//! # Checkout Orchestration
//!
//! Sequences one checkout attempt:
//!
//! ```text
//! Idle ──begin_checkout──▶ AwaitingProviderRedirect ──complete_checkout──▶ Processing ──▶ Captured
//!   │                          │                                              │
//!   └──────────────────────────┴──────────── error ──────────────────────────┴──▶ Failed
//!                              └── cancel_checkout ──▶ Cancelled
//! ```
//!
//! Configuration is checked before anything is written or sent. No step is
//! retried and no idempotency key is added: reloading the success page issues
//! a second capture, which the provider rejects.

use crate::cart::CartStore;
use crate::error::{PaymentError, PaymentResult};
use crate::order::{CustomerDetails, LineItem, NewOrder, OrderStatus, ShippingAddress};
use crate::product::{Currency, Price};
use crate::settings::{CheckoutSettings, ProviderCredentials, SettingsStore};
use crate::store::OrderStore;
use crate::strategy::{
    BoxedPaymentStrategy, CaptureResult, CheckoutUrls, PaymentStrategySelector, ProviderOrder,
    ProviderOrderItem, ProviderOrderRequest,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Where a checkout attempt stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    /// Cart has items, no order yet
    Idle,
    /// Pending order exists; shopper goes to the provider
    AwaitingProviderRedirect {
        order_id: String,
        provider_order_id: String,
        approval_url: String,
    },
    /// Shopper is back; capture in flight
    Processing {
        order_id: String,
        provider_order_id: String,
    },
    /// Payment taken, order is `processing`, cart cleared
    Captured {
        order_id: String,
        provider_order_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        capture_id: Option<String>,
    },
    /// Terminal for this attempt
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        order_id: Option<String>,
        reason: String,
    },
    /// Shopper backed out at the provider
    Cancelled { order_id: String },
}

impl CheckoutState {
    /// The failed state for an error, worded for the shopper
    pub fn failed(order_id: Option<&str>, err: &PaymentError) -> Self {
        CheckoutState::Failed {
            order_id: order_id.map(String::from),
            reason: err.shopper_message(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CheckoutState::Captured { .. } | CheckoutState::Failed { .. } | CheckoutState::Cancelled { .. }
        )
    }
}

/// Shopper-supplied checkout form
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub cart_id: String,
    pub customer: CustomerDetails,
    pub shipping_address: ShippingAddress,
}

/// Checkout orchestrator
#[derive(Clone)]
pub struct CheckoutService {
    settings: Arc<dyn SettingsStore>,
    orders: Arc<dyn OrderStore>,
    carts: Arc<dyn CartStore>,
    strategies: PaymentStrategySelector,
    urls: CheckoutUrls,
}

impl CheckoutService {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        orders: Arc<dyn OrderStore>,
        carts: Arc<dyn CartStore>,
        strategies: PaymentStrategySelector,
        urls: CheckoutUrls,
    ) -> Self {
        Self {
            settings,
            orders,
            carts,
            strategies,
            urls,
        }
    }

    /// Configuration checks, in order: checkout enabled, provider supported,
    /// credentials present.
    fn select_provider(
        &self,
        settings: Option<&CheckoutSettings>,
    ) -> PaymentResult<(BoxedPaymentStrategy, ProviderCredentials)> {
        let settings = match settings {
            Some(s) if s.checkout_enabled => s,
            _ => return Err(PaymentError::CheckoutDisabled),
        };

        let provider = settings.payment_provider.as_deref().unwrap_or("none");
        let strategy = self
            .strategies
            .get(provider)
            .ok_or_else(|| PaymentError::UnsupportedProvider {
                provider: provider.to_string(),
            })?;

        if settings.credentials.is_incomplete() {
            return Err(PaymentError::MissingCredentials {
                provider: provider.to_string(),
            });
        }

        Ok((Arc::clone(strategy), settings.credentials.clone()))
    }

    /// Create the provider order for a local order and return its approval link.
    ///
    /// Fails with a configuration error before any network call when the
    /// settings do not allow checkout. Provider failures of any kind come back
    /// as [`PaymentError::CheckoutCreationFailed`].
    #[instrument(skip(self, settings, items), fields(order_id = %order_id, total = %total.display()))]
    pub async fn create_provider_order(
        &self,
        settings: Option<&CheckoutSettings>,
        items: &[LineItem],
        total: Price,
        currency: Currency,
        order_id: &str,
    ) -> PaymentResult<ProviderOrder> {
        let (strategy, credentials) = self.select_provider(settings)?;

        let max_name = strategy.max_item_name_len();
        let request = ProviderOrderRequest {
            reference_id: order_id.to_string(),
            currency,
            total,
            items: items
                .iter()
                .map(|item| ProviderOrderItem {
                    name: item.name.chars().take(max_name).collect(),
                    quantity: item.quantity,
                    unit_amount: item.unit_price,
                })
                .collect(),
            return_url: self.urls.success_url(order_id),
            cancel_url: self.urls.cancel_url(order_id),
            brand_name: settings.and_then(|s| s.store_name.clone()),
        };

        debug!(
            "Creating {} order: {} items, total={}",
            strategy.provider_name(),
            request.items.len(),
            request.total.to_decimal_string()
        );

        strategy
            .create_order(&credentials, &request)
            .await
            .map_err(|e| {
                error!("Provider order creation failed: {}", e);
                match e {
                    e if e.is_configuration() => e,
                    other => PaymentError::CheckoutCreationFailed(other.to_string()),
                }
            })
    }

    /// Capture an approved provider order and mark the local order paid.
    ///
    /// A failed status write after a COMPLETED capture is logged; the capture
    /// still succeeds.
    #[instrument(skip(self, settings), fields(order_id = %order_id))]
    pub async fn capture_provider_order(
        &self,
        settings: Option<&CheckoutSettings>,
        order_id: &str,
        provider_order_id: &str,
    ) -> PaymentResult<CaptureResult> {
        let (strategy, credentials) = self.select_provider(settings)?;

        let result = strategy
            .capture_order(&credentials, provider_order_id)
            .await
            .map_err(|e| {
                error!("Capture request failed: {}", e);
                match e {
                    e if e.is_configuration() => e,
                    other => PaymentError::CaptureFailed(other.to_string()),
                }
            })?;

        if !result.is_completed() {
            warn!(
                "Capture for {} returned status {}",
                provider_order_id, result.status
            );
            return Err(PaymentError::PaymentDeclined {
                status: result.status,
            });
        }

        if let Err(e) = self
            .orders
            .record_capture(order_id, result.capture_id.as_deref())
            .await
        {
            error!(
                "Payment captured but order {} could not be marked processing: {}",
                order_id, e
            );
        }

        info!(
            "Captured payment: order={}, capture={:?}",
            order_id, result.capture_id
        );
        Ok(result)
    }

    /// Idle → AwaitingProviderRedirect.
    ///
    /// Creates the local `pending` order and the provider order. If the
    /// provider step fails the pending order stays behind for the back-office.
    #[instrument(skip(self, request), fields(cart_id = %request.cart_id))]
    pub async fn begin_checkout(&self, request: CheckoutRequest) -> PaymentResult<CheckoutState> {
        let cart = self.carts.load(&request.cart_id).await?;
        if cart.is_empty() {
            return Err(PaymentError::EmptyCart);
        }

        let settings = CheckoutSettings::load(self.settings.as_ref()).await?;
        let (strategy, _) = self.select_provider(settings.as_ref())?;

        // select_provider succeeded, so settings are present
        let currency = settings.as_ref().map(|s| s.currency).unwrap_or(cart.currency);
        if cart.currency != currency {
            return Err(PaymentError::CurrencyMismatch {
                expected: currency.to_string(),
                found: cart.currency.to_string(),
            });
        }

        let total = cart.total();
        let order = self
            .orders
            .create(NewOrder {
                customer: request.customer,
                shipping_address: request.shipping_address,
                items: cart.items.clone(),
                total,
                status: OrderStatus::Pending,
                payment_method: strategy.provider_name().to_string(),
                cart_id: Some(cart.id.clone()),
            })
            .await?;

        info!(
            "Created pending order {}: {} items, total={}",
            order.id,
            order.item_count(),
            total.display()
        );

        let provider_order = self
            .create_provider_order(settings.as_ref(), &cart.items, total, currency, &order.id)
            .await?;

        if let Err(e) = self
            .orders
            .set_provider_order(&order.id, &provider_order.provider_order_id)
            .await
        {
            warn!("Could not record provider order on {}: {}", order.id, e);
        }

        Ok(CheckoutState::AwaitingProviderRedirect {
            order_id: order.id,
            provider_order_id: provider_order.provider_order_id,
            approval_url: provider_order.approval_url,
        })
    }

    /// Processing → Captured, on the shopper's return from the provider.
    ///
    /// `token` is the provider order ID the provider appended to the return URL.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn complete_checkout(&self, order_id: &str, token: &str) -> PaymentResult<CheckoutState> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| PaymentError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if let Some(expected) = order.provider_order_id.as_deref() {
            if expected != token {
                return Err(PaymentError::InvalidRequest(format!(
                    "token does not belong to order {}",
                    order_id
                )));
            }
        }

        let processing = CheckoutState::Processing {
            order_id: order.id.clone(),
            provider_order_id: token.to_string(),
        };
        debug!("Checkout state: {:?}", processing);

        let settings = CheckoutSettings::load(self.settings.as_ref()).await?;
        let result = self
            .capture_provider_order(settings.as_ref(), &order.id, token)
            .await?;

        if let Some(cart_id) = order.cart_id.as_deref() {
            if let Err(e) = self.carts.clear(cart_id).await {
                warn!("Could not clear cart {} after capture: {}", cart_id, e);
            }
        }

        Ok(CheckoutState::Captured {
            order_id: order.id,
            provider_order_id: result.provider_order_id,
            capture_id: result.capture_id,
        })
    }

    /// AwaitingProviderRedirect → Cancelled. The order is left as it is.
    pub fn cancel_checkout(&self, order_id: &str) -> CheckoutState {
        info!("Shopper cancelled at provider: order={}", order_id);
        CheckoutState::Cancelled {
            order_id: order_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{Cart, InMemoryCartStore};
    use crate::order::Order;
    use crate::product::{Product, ProductVariant};
    use crate::settings::{keys, InMemorySettings};
    use crate::store::InMemoryOrderStore;
    use crate::strategy::PaymentStrategy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockStrategy {
        calls: AtomicUsize,
        fail_create: bool,
        capture_status: String,
        last_request: Mutex<Option<ProviderOrderRequest>>,
    }

    impl MockStrategy {
        fn new(capture_status: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_create: false,
                capture_status: capture_status.to_string(),
                last_request: Mutex::new(None),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaymentStrategy for MockStrategy {
        async fn create_order(
            &self,
            _credentials: &ProviderCredentials,
            request: &ProviderOrderRequest,
        ) -> PaymentResult<ProviderOrder> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            if self.fail_create {
                return Err(PaymentError::ProviderError {
                    provider: "paypal".into(),
                    message: "HTTP 500".into(),
                });
            }
            Ok(ProviderOrder {
                provider_order_id: "PP-ORDER-1".into(),
                approval_url: "https://www.sandbox.paypal.com/checkoutnow?token=PP-ORDER-1".into(),
            })
        }

        async fn capture_order(
            &self,
            _credentials: &ProviderCredentials,
            provider_order_id: &str,
        ) -> PaymentResult<CaptureResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CaptureResult {
                provider_order_id: provider_order_id.to_string(),
                status: self.capture_status.clone(),
                capture_id: self.capture_status.eq_ignore_ascii_case("completed").then(|| "CAP123".to_string()),
            })
        }

        fn provider_name(&self) -> &'static str {
            "paypal"
        }

        fn max_item_name_len(&self) -> usize {
            10
        }
    }

    struct Harness {
        service: CheckoutService,
        strategy: Arc<MockStrategy>,
        orders: Arc<InMemoryOrderStore>,
        carts: Arc<InMemoryCartStore>,
    }

    fn enabled_settings() -> InMemorySettings {
        InMemorySettings::new()
            .with(keys::CHECKOUT_ENABLED, "true")
            .with(keys::PAYMENT_PROVIDER, "paypal")
            .with(keys::PAYPAL_CLIENT_ID, "client")
            .with(keys::PAYPAL_CLIENT_SECRET, "secret")
            .with(keys::STORE_NAME, "Gemcart")
    }

    fn harness(settings: InMemorySettings, strategy: MockStrategy) -> Harness {
        let strategy = Arc::new(strategy);
        let orders = Arc::new(InMemoryOrderStore::new());
        let carts = Arc::new(InMemoryCartStore::new(Currency::USD));
        let service = CheckoutService::new(
            Arc::new(settings),
            orders.clone(),
            carts.clone(),
            PaymentStrategySelector::new().with_strategy(strategy.clone()),
            CheckoutUrls::new("https://gemcart.shop"),
        );
        Harness {
            service,
            strategy,
            orders,
            carts,
        }
    }

    async fn fill_cart(carts: &InMemoryCartStore, cart_id: &str) -> Cart {
        let usd = |a| Price::new(a, Currency::USD);
        let product = Product::new("hoops", "Hammered Gold Hoop Earrings", usd(240.0)).with_variant(
            ProductVariant::new("hoops-small", usd(240.0))
                .with_option("Size", "Small")
                .with_stock(10),
        );
        let mut cart = carts.load(cart_id).await.unwrap();
        cart.add_variant(&product, &product.variants[0], 2).unwrap();
        carts.save(&cart).await.unwrap();
        cart
    }

    fn checkout_request(cart_id: &str) -> CheckoutRequest {
        CheckoutRequest {
            cart_id: cart_id.to_string(),
            customer: CustomerDetails {
                name: "Mary Anning".into(),
                email: "mary@example.com".into(),
                phone: None,
            },
            shipping_address: ShippingAddress {
                line1: "3 Cliff Walk".into(),
                line2: None,
                city: "Lyme Regis".into(),
                region: None,
                postal_code: "DT7 3QA".into(),
                country: "GB".into(),
            },
        }
    }

    async fn only_order(orders: &InMemoryOrderStore, order_id: &str) -> Order {
        orders.get(order_id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_disabled_checkout_fails_before_network() {
        let h = harness(
            InMemorySettings::new().with(keys::CHECKOUT_ENABLED, "false"),
            MockStrategy::new("COMPLETED"),
        );
        let settings = CheckoutSettings::load(&InMemorySettings::new().with(keys::CHECKOUT_ENABLED, "false"))
            .await
            .unwrap();

        let err = h
            .service
            .create_provider_order(settings.as_ref(), &[], Price::zero(Currency::USD), Currency::USD, "ord-1")
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::CheckoutDisabled));
        assert_eq!(h.strategy.calls(), 0);
    }

    #[tokio::test]
    async fn test_disabled_wins_over_bad_mode() {
        let h = harness(
            InMemorySettings::new()
                .with(keys::CHECKOUT_ENABLED, "false")
                .with(keys::PAYPAL_MODE, "staging"),
            MockStrategy::new("COMPLETED"),
        );
        fill_cart(&h.carts, "cart-1").await;

        let err = h.service.begin_checkout(checkout_request("cart-1")).await.unwrap_err();
        assert!(matches!(err, PaymentError::CheckoutDisabled));
        assert_eq!(h.strategy.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_settings_is_disabled() {
        let h = harness(InMemorySettings::new(), MockStrategy::new("COMPLETED"));
        fill_cart(&h.carts, "cart-1").await;

        let err = h.service.begin_checkout(checkout_request("cart-1")).await.unwrap_err();
        assert!(matches!(err, PaymentError::CheckoutDisabled));
        assert_eq!(h.strategy.calls(), 0);
    }

    #[tokio::test]
    async fn test_configuration_checks_in_order() {
        let unsupported = enabled_settings().with(keys::PAYMENT_PROVIDER, "stripe");
        let h = harness(unsupported, MockStrategy::new("COMPLETED"));
        fill_cart(&h.carts, "cart-1").await;
        let err = h.service.begin_checkout(checkout_request("cart-1")).await.unwrap_err();
        assert!(matches!(err, PaymentError::UnsupportedProvider { ref provider } if provider == "stripe"));

        let no_secret = enabled_settings().with(keys::PAYPAL_CLIENT_SECRET, "  ");
        let h = harness(no_secret, MockStrategy::new("COMPLETED"));
        fill_cart(&h.carts, "cart-1").await;
        let err = h.service.begin_checkout(checkout_request("cart-1")).await.unwrap_err();
        assert!(matches!(err, PaymentError::MissingCredentials { .. }));
        assert_eq!(h.strategy.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let h = harness(enabled_settings(), MockStrategy::new("COMPLETED"));
        let err = h.service.begin_checkout(checkout_request("empty")).await.unwrap_err();
        assert!(matches!(err, PaymentError::EmptyCart));
    }

    #[tokio::test]
    async fn test_begin_checkout_creates_pending_order() {
        let h = harness(enabled_settings(), MockStrategy::new("COMPLETED"));
        fill_cart(&h.carts, "cart-1").await;

        let state = h.service.begin_checkout(checkout_request("cart-1")).await.unwrap();
        let CheckoutState::AwaitingProviderRedirect {
            order_id,
            provider_order_id,
            approval_url,
        } = state
        else {
            panic!("unexpected state: {:?}", state);
        };

        assert_eq!(provider_order_id, "PP-ORDER-1");
        assert!(approval_url.contains("token=PP-ORDER-1"));

        let order = only_order(&h.orders, &order_id).await;
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, Price::new(480.0, Currency::USD));
        assert_eq!(order.provider_order_id.as_deref(), Some("PP-ORDER-1"));
        assert_eq!(order.payment_method, "paypal");

        let request = h.strategy.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.reference_id, order_id);
        assert_eq!(request.items[0].name, "Hammered G");
        assert_eq!(request.return_url, format!("https://gemcart.shop/checkout/success?order_id={}", order_id));
        assert_eq!(request.cancel_url, format!("https://gemcart.shop/checkout/cancel?order_id={}", order_id));
        assert_eq!(request.brand_name.as_deref(), Some("Gemcart"));
    }

    #[tokio::test]
    async fn test_provider_failure_is_creation_failure() {
        let mut strategy = MockStrategy::new("COMPLETED");
        strategy.fail_create = true;
        let h = harness(enabled_settings(), strategy);
        fill_cart(&h.carts, "cart-1").await;

        let err = h.service.begin_checkout(checkout_request("cart-1")).await.unwrap_err();
        assert!(matches!(err, PaymentError::CheckoutCreationFailed(_)));
    }

    #[tokio::test]
    async fn test_completed_capture_marks_processing_and_clears_cart() {
        let h = harness(enabled_settings(), MockStrategy::new("COMPLETED"));
        fill_cart(&h.carts, "cart-1").await;

        let CheckoutState::AwaitingProviderRedirect { order_id, .. } =
            h.service.begin_checkout(checkout_request("cart-1")).await.unwrap()
        else {
            panic!("expected redirect");
        };

        let state = h.service.complete_checkout(&order_id, "PP-ORDER-1").await.unwrap();
        assert_eq!(
            state,
            CheckoutState::Captured {
                order_id: order_id.clone(),
                provider_order_id: "PP-ORDER-1".into(),
                capture_id: Some("CAP123".into()),
            }
        );
        assert!(state.is_terminal());
        let order = only_order(&h.orders, &order_id).await;
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.capture_id.as_deref(), Some("CAP123"));
        assert!(h.carts.load("cart-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_declined_capture_leaves_order_pending() {
        let h = harness(enabled_settings(), MockStrategy::new("DECLINED"));
        fill_cart(&h.carts, "cart-1").await;

        let CheckoutState::AwaitingProviderRedirect { order_id, .. } =
            h.service.begin_checkout(checkout_request("cart-1")).await.unwrap()
        else {
            panic!("expected redirect");
        };

        let err = h.service.complete_checkout(&order_id, "PP-ORDER-1").await.unwrap_err();
        assert!(matches!(err, PaymentError::PaymentDeclined { ref status } if status == "DECLINED"));
        assert!(err.to_string().contains("DECLINED"));

        let order = only_order(&h.orders, &order_id).await;
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.capture_id.is_none());
        assert!(!h.carts.load("cart-1").await.unwrap().is_empty());

        let failed = CheckoutState::failed(Some(order_id.as_str()), &err);
        assert!(matches!(failed, CheckoutState::Failed { ref reason, .. } if reason.contains("DECLINED")));
    }

    #[tokio::test]
    async fn test_capture_survives_failed_status_update() {
        let h = harness(enabled_settings(), MockStrategy::new("COMPLETED"));
        let settings = CheckoutSettings::load(&enabled_settings()).await.unwrap();

        // No such local order, so the status write fails after the capture
        let result = h
            .service
            .capture_provider_order(settings.as_ref(), "missing-order", "PP-ORDER-9")
            .await
            .unwrap();

        assert_eq!(result.capture_id.as_deref(), Some("CAP123"));
    }

    #[tokio::test]
    async fn test_token_must_match_order() {
        let h = harness(enabled_settings(), MockStrategy::new("COMPLETED"));
        fill_cart(&h.carts, "cart-1").await;
        let CheckoutState::AwaitingProviderRedirect { order_id, .. } =
            h.service.begin_checkout(checkout_request("cart-1")).await.unwrap()
        else {
            panic!("expected redirect");
        };

        let err = h.service.complete_checkout(&order_id, "SOMEONE-ELSE").await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidRequest(_)));
        assert_eq!(only_order(&h.orders, &order_id).await.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_cancel_has_no_side_effects() {
        let h = harness(enabled_settings(), MockStrategy::new("COMPLETED"));
        fill_cart(&h.carts, "cart-1").await;
        let CheckoutState::AwaitingProviderRedirect { order_id, .. } =
            h.service.begin_checkout(checkout_request("cart-1")).await.unwrap()
        else {
            panic!("expected redirect");
        };

        let state = h.service.cancel_checkout(&order_id);
        assert_eq!(state, CheckoutState::Cancelled { order_id: order_id.clone() });
        assert_eq!(only_order(&h.orders, &order_id).await.status, OrderStatus::Pending);
        assert_eq!(h.carts.load("cart-1").await.unwrap().item_count(), 2);
    }
}
