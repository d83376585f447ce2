//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Catalog:
///   - GET  /api/v1/products
///   - GET  /api/v1/products/{slug}
///   - POST /api/v1/products/{slug}/variant
///   - POST /api/v1/products/{slug}/availability
///
/// - Carts:
///   - POST   /api/v1/carts
///   - GET    /api/v1/carts/{cart_id}
///   - POST   /api/v1/carts/{cart_id}/items
///   - DELETE /api/v1/carts/{cart_id}/items/{variant_id}
///
/// - Checkout:
///   - POST /api/v1/checkout
///   - GET  /api/v1/orders/{order_id}
///
/// - Provider return pages:
///   - GET /checkout/success
///   - GET /checkout/cancel
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // PayPal sends the shopper back here
    let checkout_routes = Router::new()
        .route("/success", get(handlers::checkout_success))
        .route("/cancel", get(handlers::checkout_cancel));

    let api_routes = Router::new()
        // Catalog
        .route("/products", get(handlers::list_products))
        .route("/products/{slug}", get(handlers::get_product))
        .route("/products/{slug}/variant", post(handlers::resolve_variant))
        .route("/products/{slug}/availability", post(handlers::option_availability))
        // Carts
        .route("/carts", post(handlers::create_cart))
        .route("/carts/{cart_id}", get(handlers::get_cart))
        .route("/carts/{cart_id}/items", post(handlers::add_cart_item))
        .route(
            "/carts/{cart_id}/items/{variant_id}",
            delete(handlers::remove_cart_item),
        )
        // Checkout
        .route("/checkout", post(handlers::create_checkout))
        .route("/orders/{order_id}", get(handlers::get_order));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/checkout", checkout_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
