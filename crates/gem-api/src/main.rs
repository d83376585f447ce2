//! # Gemcart
//!
//! Jewelry storefront API with PayPal checkout.
//!
//! ## Usage
//!
//! ```bash
//! # Catalog and store settings are read from config/catalog.toml and
//! # config/settings.toml; credentials usually come from the environment
//! export PAYPAL_CLIENT_ID=...
//! export PAYPAL_CLIENT_SECRET=...
//! export BASE_URL=https://gemcart.shop
//!
//! # Run the server
//! gemcart
//! ```

use gem_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new().await?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Products loaded: {}", state.catalog.products.len());
    info!("Payment providers: {:?}", state.strategies.providers());

    let app = routes::create_router(state);

    info!("Gemcart starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Products: GET http://{}/api/v1/products", addr);
        info!("Checkout: POST http://{}/api/v1/checkout", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  💎 Gemcart 💎
  ━━━━━━━━━━━━━━━━━━━━━━━
  Jewelry storefront
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
