//! # Application State
//!
//! Shared state for the Axum application.
//! Holds the catalog, the stores and the checkout orchestrator.

use gem_core::settings::keys;
use gem_core::{
    CartStore, CheckoutService, CheckoutSettings, CheckoutUrls, Currency, InMemoryCartStore,
    InMemoryOrderStore, InMemorySettings, OrderStore, PaymentStrategySelector, ProductCatalog,
    SettingsStore,
};
use gem_paypal::PayPalStrategy;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public storefront URL, used for the provider return URLs
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Product catalog
    pub catalog: Arc<ProductCatalog>,
    /// Shopper carts
    pub carts: Arc<dyn CartStore>,
    /// Orders
    pub orders: Arc<dyn OrderStore>,
    /// Checkout orchestrator
    pub checkout: CheckoutService,
    /// Registered payment providers
    pub strategies: PaymentStrategySelector,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build state from config files and the environment, with PayPal registered
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let catalog = load_product_catalog()?;
        let settings = load_settings()?;

        let currency = CheckoutSettings::load(&settings)
            .await
            .map_err(|e| anyhow::anyhow!("Invalid store settings: {}", e))?
            .map(|s| s.currency)
            .unwrap_or_default();

        let strategies =
            PaymentStrategySelector::new().with_strategy(Arc::new(PayPalStrategy::from_env()));

        Ok(Self::from_parts(
            config,
            catalog,
            Arc::new(settings),
            strategies,
            currency,
        ))
    }

    /// Assemble state from explicit parts with in-memory cart and order stores
    pub fn from_parts(
        config: AppConfig,
        catalog: ProductCatalog,
        settings: Arc<dyn SettingsStore>,
        strategies: PaymentStrategySelector,
        currency: Currency,
    ) -> Self {
        for (product_id, duplicates) in catalog.integrity_report() {
            for dup in duplicates {
                warn!(
                    "Product {} has variants sharing one option combination: {:?} (resolving to {})",
                    product_id,
                    dup.variant_ids,
                    dup.variant_ids.first().map(String::as_str).unwrap_or("none")
                );
            }
        }

        let carts: Arc<dyn CartStore> = Arc::new(InMemoryCartStore::new(currency));
        let orders: Arc<dyn OrderStore> = Arc::new(InMemoryOrderStore::new());
        let checkout = CheckoutService::new(
            settings,
            Arc::clone(&orders),
            Arc::clone(&carts),
            strategies.clone(),
            CheckoutUrls::new(&config.base_url),
        );

        Self {
            catalog: Arc::new(catalog),
            carts,
            orders,
            checkout,
            strategies,
            config,
        }
    }
}

/// First readable file among `config/`, `../config/`, `../../config/`
fn read_config_file(name: &str) -> Option<(String, String)> {
    ["config", "../config", "../../config"]
        .iter()
        .map(|dir| format!("{}/{}", dir, name))
        .find_map(|path| std::fs::read_to_string(&path).ok().map(|c| (path, c)))
}

/// Load product catalog from config file
fn load_product_catalog() -> anyhow::Result<ProductCatalog> {
    match read_config_file("catalog.toml") {
        Some((path, content)) => {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            info!("Loaded {} products from {}", catalog.products.len(), path);
            Ok(catalog)
        }
        None => {
            warn!("No product catalog found, using empty catalog");
            Ok(ProductCatalog::new())
        }
    }
}

/// Environment variables that override stored settings
const SETTING_OVERRIDES: [(&str, &str); 5] = [
    ("CHECKOUT_ENABLED", keys::CHECKOUT_ENABLED),
    ("PAYMENT_PROVIDER", keys::PAYMENT_PROVIDER),
    ("PAYPAL_MODE", keys::PAYPAL_MODE),
    ("PAYPAL_CLIENT_ID", keys::PAYPAL_CLIENT_ID),
    ("PAYPAL_CLIENT_SECRET", keys::PAYPAL_CLIENT_SECRET),
];

/// Load store settings from config file, then apply env overrides
fn load_settings() -> anyhow::Result<InMemorySettings> {
    let settings = match read_config_file("settings.toml") {
        Some((path, content)) => {
            let settings = InMemorySettings::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            info!("Loaded store settings from {}", path);
            settings
        }
        None => {
            warn!("No store settings found; checkout stays disabled until configured");
            InMemorySettings::new()
        }
    };

    for (var, key) in SETTING_OVERRIDES {
        if let Ok(value) = std::env::var(var) {
            if !value.trim().is_empty() {
                settings.set(key, value);
            }
        }
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gem_core::{Price, Product, ProductVariant};

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: "test".to_string(),
        };

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
        assert!(!config.is_production());
    }

    #[test]
    fn test_bad_host_is_error() {
        let config = AppConfig {
            host: "not a host".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: "production".to_string(),
        };
        assert!(config.socket_addr().is_err());
        assert!(config.is_production());
    }

    #[tokio::test]
    async fn test_shipped_config_files_parse() {
        let catalog = ProductCatalog::from_toml(include_str!("../../../config/catalog.toml")).unwrap();
        assert_eq!(catalog.products.len(), 3);
        assert!(catalog.integrity_report().is_empty());

        let ring = catalog.get_by_slug("solitaire-ring").unwrap();
        let selection = gem_core::Selection::new().with("Metal", "Silver").with("Size", "7");
        assert_eq!(ring.resolver().resolve(&selection).unwrap().id, "solitaire-silver-7");

        let settings = InMemorySettings::from_toml(include_str!("../../../config/settings.toml")).unwrap();
        let typed = CheckoutSettings::load(&settings).await.unwrap().unwrap();
        assert!(!typed.checkout_enabled);
        assert!(typed.credentials.is_incomplete());
    }

    #[tokio::test]
    async fn test_from_parts_shares_stores_with_checkout() {
        let usd = |a| Price::new(a, Currency::USD);
        let mut catalog = ProductCatalog::new();
        catalog.add(
            Product::new("studs", "Pearl Studs", usd(95.0))
                .with_option("Size", &["6mm"])
                .with_variant(ProductVariant::new("studs-a", usd(95.0)).with_option("Size", "6mm"))
                .with_variant(ProductVariant::new("studs-b", usd(99.0)).with_option("Size", "6mm")),
        );

        let state = AppState::from_parts(
            AppConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
                environment: "test".to_string(),
            },
            catalog,
            Arc::new(InMemorySettings::new()),
            PaymentStrategySelector::new(),
            Currency::EUR,
        );

        assert_eq!(state.catalog.integrity_report().len(), 1);
        let cart = state.carts.load("fresh").await.unwrap();
        assert_eq!(cart.currency, Currency::EUR);
        assert!(cart.is_empty());
    }
}
