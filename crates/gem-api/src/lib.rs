//! # gem-api
//!
//! HTTP API layer for the gemcart storefront.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for the catalog, variant resolution and carts
//! - The PayPal checkout round trip (begin, success page capture, cancel page)
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/products` | List products |
//! | GET | `/api/v1/products/{slug}` | Get product |
//! | POST | `/api/v1/products/{slug}/variant` | Resolve a selection |
//! | POST | `/api/v1/products/{slug}/availability` | Option availability |
//! | POST | `/api/v1/carts` | New cart |
//! | GET | `/api/v1/carts/{cart_id}` | View cart |
//! | POST | `/api/v1/carts/{cart_id}/items` | Add to cart |
//! | DELETE | `/api/v1/carts/{cart_id}/items/{variant_id}` | Remove from cart |
//! | POST | `/api/v1/checkout` | Begin PayPal checkout |
//! | GET | `/api/v1/orders/{order_id}` | Order status |
//! | GET | `/checkout/success` | Capture on return from PayPal |
//! | GET | `/checkout/cancel` | Shopper cancelled at PayPal |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
