//! # Request Handlers
//!
//! Axum request handlers for the storefront API: catalog browsing with
//! variant resolution, carts, and the PayPal checkout round trip.

use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use gem_core::{
    Cart, CheckoutRequest, CheckoutState, OptionAvailability, Order, OrderStatus, PaymentError,
    Price, Product, ProductVariant, Selection, VariantDisplay,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Current option selection on a product page
#[derive(Debug, Default, Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub selection: Selection,
}

/// Product page payload
#[derive(Debug, Serialize)]
pub struct ProductDetailResponse {
    pub product: Product,
    /// Availability with nothing selected
    pub availability: Vec<OptionAvailability>,
}

/// Resolution of a selection
#[derive(Debug, Serialize)]
pub struct VariantResponse {
    /// Every option has a value
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<ProductVariant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<VariantDisplay>,
    /// Resolved variant can be added to the cart
    pub purchasable: bool,
}

/// Availability matrix for the product page
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub options: Vec<OptionAvailability>,
}

/// Add-to-cart request; give either `variant_id` or a complete `selection`
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    /// Product slug or ID
    pub product: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub selection: Option<Selection>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Cart with computed totals
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: Cart,
    pub total: Price,
    pub total_display: String,
    pub item_count: u32,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        let total = cart.total();
        Self {
            total_display: total.display(),
            item_count: cart.item_count(),
            total,
            cart,
        }
    }
}

/// Begin-checkout response
#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    pub order_id: String,
    pub provider_order_id: String,
    /// Redirect the shopper here
    pub approval_url: String,
}

/// Order status as seen by the shopper
#[derive(Debug, Serialize)]
pub struct OrderStatusResponse {
    pub order_id: String,
    pub status: OrderStatus,
    pub total: Price,
    pub item_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_id: Option<String>,
    pub created_at: String,
}

impl From<Order> for OrderStatusResponse {
    fn from(order: Order) -> Self {
        Self {
            item_count: order.item_count(),
            order_id: order.id,
            status: order.status,
            total: order.total,
            capture_id: order.capture_id,
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

/// Query string on the provider's return to the success page
#[derive(Debug, Deserialize)]
pub struct ReturnParams {
    #[serde(default)]
    pub order_id: Option<String>,
    /// Provider order ID, appended by PayPal
    #[serde(default)]
    pub token: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let code = err.status_code();
    if code >= 500 {
        error!("Request failed: {}", err);
    }
    let mut response = ErrorResponse::new(err.shopper_message(), code);
    if let PaymentError::InsufficientStock { available, .. } = &err {
        response = response.with_details(format!("{} available", available));
    }
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn active_product<'a>(state: &'a AppState, slug: &str) -> Result<&'a Product, ApiError> {
    state
        .catalog
        .get_by_slug(slug)
        .filter(|p| p.active)
        .ok_or_else(|| {
            payment_error_to_response(PaymentError::ProductNotFound {
                product_id: slug.to_string(),
            })
        })
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "gemcart",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Get active products
pub async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    let products: Vec<_> = state.catalog.active_products().collect();
    Json(serde_json::json!({
        "products": products,
        "count": products.len()
    }))
}

/// Get single product with its initial availability
pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetailResponse>, ApiError> {
    let product = active_product(&state, &slug)?;

    Ok(Json(ProductDetailResponse {
        availability: product.resolver().availability(&Selection::new()),
        product: product.clone(),
    }))
}

/// Resolve a selection to a variant
pub async fn resolve_variant(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<VariantResponse>, ApiError> {
    let product = active_product(&state, &slug)?;
    let variant = product.resolver().resolve(&request.selection);

    Ok(Json(VariantResponse {
        complete: request.selection.is_complete(&product.options),
        purchasable: variant.is_some_and(ProductVariant::is_purchasable),
        display: variant.map(|v| gem_core::derived_display(v, &product.name)),
        variant: variant.cloned(),
    }))
}

/// Which option values stay reachable under a selection
pub async fn option_availability(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let product = active_product(&state, &slug)?;

    Ok(Json(AvailabilityResponse {
        options: product.resolver().availability(&request.selection),
    }))
}

/// Start a new, empty cart
pub async fn create_cart(State(state): State<AppState>) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let cart_id = uuid::Uuid::new_v4().to_string();
    let cart = state.carts.load(&cart_id).await.map_err(payment_error_to_response)?;
    state.carts.save(&cart).await.map_err(payment_error_to_response)?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

/// View a cart
pub async fn get_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.load(&cart_id).await.map_err(payment_error_to_response)?;
    Ok(Json(cart.into()))
}

/// Add a variant to a cart
#[instrument(skip(state, request), fields(cart_id = %cart_id, product = %request.product))]
pub async fn add_cart_item(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let product = active_product(&state, &request.product)?;

    let variant = match (&request.variant_id, &request.selection) {
        (Some(variant_id), _) => product.variant(variant_id).ok_or_else(|| PaymentError::VariantNotFound {
            variant_id: variant_id.clone(),
        }),
        (None, Some(selection)) => product.resolver().resolve(selection).ok_or_else(|| {
            PaymentError::VariantNotFound {
                variant_id: selection
                    .iter()
                    .map(|(name, value)| format!("{}={}", name, value))
                    .collect::<Vec<_>>()
                    .join(","),
            }
        }),
        (None, None) => Err(PaymentError::InvalidRequest(
            "provide 'variant_id' or 'selection'".to_string(),
        )),
    }
    .map_err(payment_error_to_response)?;

    let mut cart = state.carts.load(&cart_id).await.map_err(payment_error_to_response)?;
    cart.add_variant(product, variant, request.quantity)
        .map_err(payment_error_to_response)?;
    state.carts.save(&cart).await.map_err(payment_error_to_response)?;

    info!(
        "Added {} x {} to cart, total={}",
        request.quantity,
        variant.id,
        cart.total().display()
    );
    Ok(Json(cart.into()))
}

/// Remove a line from a cart
pub async fn remove_cart_item(
    State(state): State<AppState>,
    Path((cart_id, variant_id)): Path<(String, String)>,
) -> Result<Json<CartResponse>, ApiError> {
    let mut cart = state.carts.load(&cart_id).await.map_err(payment_error_to_response)?;

    if !cart.remove(&variant_id) {
        return Err(payment_error_to_response(PaymentError::VariantNotFound { variant_id }));
    }
    state.carts.save(&cart).await.map_err(payment_error_to_response)?;

    Ok(Json(cart.into()))
}

/// Create the pending order and the PayPal order
#[instrument(skip(state, request), fields(cart_id = %request.cart_id))]
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, ApiError> {
    match state.checkout.begin_checkout(request).await {
        Ok(CheckoutState::AwaitingProviderRedirect {
            order_id,
            provider_order_id,
            approval_url,
        }) => {
            info!("Checkout started: order={}", order_id);
            Ok(Json(CreateCheckoutResponse {
                order_id,
                provider_order_id,
                approval_url,
            }))
        }
        Ok(other) => Err(payment_error_to_response(PaymentError::Internal(format!(
            "unexpected checkout state: {:?}",
            other
        )))),
        Err(e) => {
            warn!("Checkout could not start: {}", e);
            Err(payment_error_to_response(e))
        }
    }
}

/// Order status lookup
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderStatusResponse>, ApiError> {
    let order = state
        .orders
        .get(&order_id)
        .await
        .map_err(payment_error_to_response)?
        .ok_or_else(|| payment_error_to_response(PaymentError::OrderNotFound { order_id }))?;

    Ok(Json(order.into()))
}

/// Checkout success page: the shopper is back from PayPal, capture now
#[instrument(skip(state, params))]
pub async fn checkout_success(
    State(state): State<AppState>,
    Query(params): Query<ReturnParams>,
) -> (StatusCode, Html<String>) {
    let (Some(order_id), Some(token)) = (params.order_id, params.token) else {
        return (
            StatusCode::BAD_REQUEST,
            failure_page(&CheckoutState::Failed {
                order_id: None,
                reason: "The payment link is incomplete.".to_string(),
            }),
        );
    };

    match state.checkout.complete_checkout(&order_id, &token).await {
        Ok(CheckoutState::Captured {
            order_id,
            capture_id,
            ..
        }) => (StatusCode::OK, success_page(&order_id, capture_id.as_deref())),
        Ok(other) => (StatusCode::INTERNAL_SERVER_ERROR, failure_page(&other)),
        Err(e) => {
            warn!("Capture failed for order {}: {}", order_id, e);
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, failure_page(&CheckoutState::failed(Some(order_id.as_str()), &e)))
        }
    }
}

/// Checkout cancel page
pub async fn checkout_cancel(
    State(state): State<AppState>,
    Query(params): Query<ReturnParams>,
) -> impl IntoResponse {
    if let Some(order_id) = params.order_id.as_deref() {
        state.checkout.cancel_checkout(order_id);
    }

    page(
        "Payment Cancelled",
        "❌",
        "<h1>Payment Cancelled</h1>\n        <p style=\"color: #666;\">No charges were made. Your cart is still waiting.</p>",
    )
}

// =============================================================================
// Pages
// =============================================================================

fn success_page(order_id: &str, capture_id: Option<&str>) -> Html<String> {
    let capture = capture_id
        .map(|id| format!("<p>Payment reference: <code>{}</code></p>", escape_html(id)))
        .unwrap_or_default();

    page(
        "Payment Successful",
        "✅",
        &format!(
            "<h1>Thank you!</h1>\n        <p>Order: <code>{}</code></p>\n        {}\n        <p style=\"color: #666;\">We are preparing your order.</p>",
            escape_html(order_id),
            capture
        ),
    )
}

fn failure_page(state: &CheckoutState) -> Html<String> {
    let reason = match state {
        CheckoutState::Failed { reason, .. } => reason.as_str(),
        _ => "Something went wrong. Please try again.",
    };

    page(
        "Payment Failed",
        "⚠️",
        &format!(
            "<h1>Payment Failed</h1>\n        <p style=\"color: #666;\">{}</p>",
            escape_html(reason)
        ),
    )
}

fn page(title: &str, icon: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"
<!DOCTYPE html>
<html>
<head><title>{title}</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: linear-gradient(135deg, #2b2118 0%, #4a3b2a 100%);">
    <div style="background: white; padding: 60px; border-radius: 16px; text-align: center;">
        <div style="font-size: 60px;">{icon}</div>
        {body}
    </div>
</body>
</html>
"#
    ))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
