//! # PayPal Configuration
//!
//! API endpoints per environment. Credentials are not kept here: they come
//! from the store settings on every checkout.

use gem_core::ProviderMode;
use std::env;

/// Sandbox REST endpoint
pub const SANDBOX_API_BASE_URL: &str = "https://api-m.sandbox.paypal.com";

/// Live REST endpoint
pub const LIVE_API_BASE_URL: &str = "https://api-m.paypal.com";

/// PayPal API configuration
#[derive(Debug, Clone)]
pub struct PayPalConfig {
    /// Used when the settings say `sandbox`
    pub sandbox_base_url: String,

    /// Used when the settings say `live`
    pub live_base_url: String,
}

impl PayPalConfig {
    /// Default PayPal endpoints
    pub fn new() -> Self {
        Self {
            sandbox_base_url: SANDBOX_API_BASE_URL.to_string(),
            live_base_url: LIVE_API_BASE_URL.to_string(),
        }
    }

    /// Load endpoint overrides from the environment.
    ///
    /// Optional env vars:
    /// - `PAYPAL_API_BASE_URL` (replaces both endpoints, for a local mock)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if present

        match env::var("PAYPAL_API_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Self::new().with_api_base_url(url.trim()),
            _ => Self::new(),
        }
    }

    /// Base URL for a mode
    pub fn api_base_url(&self, mode: ProviderMode) -> &str {
        match mode {
            ProviderMode::Sandbox => &self.sandbox_base_url,
            ProviderMode::Live => &self.live_base_url,
        }
    }

    /// Builder: send every mode to one URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        self.sandbox_base_url = url.clone();
        self.live_base_url = url;
        self
    }
}

impl Default for PayPalConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_per_mode() {
        let config = PayPalConfig::new();
        assert_eq!(
            config.api_base_url(ProviderMode::Sandbox),
            "https://api-m.sandbox.paypal.com"
        );
        assert_eq!(
            config.api_base_url(ProviderMode::Live),
            "https://api-m.paypal.com"
        );
    }

    #[test]
    fn test_override_applies_to_both_modes() {
        let config = PayPalConfig::new().with_api_base_url("http://127.0.0.1:9999/");
        assert_eq!(config.api_base_url(ProviderMode::Sandbox), "http://127.0.0.1:9999");
        assert_eq!(config.api_base_url(ProviderMode::Live), "http://127.0.0.1:9999");
    }
}
