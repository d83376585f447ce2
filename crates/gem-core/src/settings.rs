//! # Store Settings
//!
//! Checkout configuration lives in a key/value settings store edited from the
//! back-office. The orchestrator reads it on every checkout attempt, so
//! switching checkout off or rotating credentials takes effect immediately.

use crate::error::{PaymentError, PaymentResult};
use crate::product::Currency;
use async_trait::async_trait;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::RwLock;
use tracing::warn;

/// Setting keys understood by checkout
pub mod keys {
    pub const CHECKOUT_ENABLED: &str = "checkout_enabled";
    pub const PAYMENT_PROVIDER: &str = "payment_provider";
    pub const PAYPAL_MODE: &str = "paypal_mode";
    pub const PAYPAL_CLIENT_ID: &str = "paypal_client_id";
    pub const PAYPAL_CLIENT_SECRET: &str = "paypal_client_secret";
    pub const CURRENCY: &str = "currency";
    pub const STORE_NAME: &str = "store_name";
}

/// Key/value settings backend
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Get one setting
    async fn get(&self, key: &str) -> PaymentResult<Option<String>>;

    /// Get every setting
    async fn all(&self) -> PaymentResult<HashMap<String, String>>;
}

/// Process-local settings store
#[derive(Debug, Default)]
pub struct InMemorySettings {
    values: RwLock<HashMap<String, String>>,
}

impl InMemorySettings {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a setting
    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a setting, replacing any earlier value
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.into(), value.into());
        }
    }

    /// Load from a flat TOML table; scalars are stored as their text form.
    pub fn from_toml(toml_str: &str) -> PaymentResult<Self> {
        let table: toml::Table = toml::from_str(toml_str)
            .map_err(|e| PaymentError::Configuration(format!("invalid settings file: {}", e)))?;

        let store = Self::new();
        for (key, value) in table {
            let text = match value {
                toml::Value::String(s) => s,
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                other => {
                    return Err(PaymentError::Configuration(format!(
                        "setting {} must be a scalar, got {}",
                        key,
                        other.type_str()
                    )))
                }
            };
            store.set(key, text);
        }
        Ok(store)
    }
}

#[async_trait]
impl SettingsStore for InMemorySettings {
    async fn get(&self, key: &str) -> PaymentResult<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| PaymentError::Store("settings lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    async fn all(&self) -> PaymentResult<HashMap<String, String>> {
        let values = self
            .values
            .read()
            .map_err(|_| PaymentError::Store("settings lock poisoned".to_string()))?;
        Ok(values.clone())
    }
}

/// Sandbox or live provider environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    Sandbox,
    Live,
}

impl FromStr for ProviderMode {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "test" => Ok(ProviderMode::Sandbox),
            "live" | "production" => Ok(ProviderMode::Live),
            other => Err(PaymentError::Configuration(format!(
                "unknown provider mode: {}",
                other
            ))),
        }
    }
}

/// Client-credential pair plus environment
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub mode: ProviderMode,
}

impl ProviderCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        mode: ProviderMode,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            mode,
        }
    }

    /// True when either half is blank
    pub fn is_incomplete(&self) -> bool {
        self.client_id.trim().is_empty() || self.client_secret.trim().is_empty()
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("mode", &self.mode)
            .finish()
    }
}

/// Typed view of the checkout settings
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub checkout_enabled: bool,
    pub payment_provider: Option<String>,
    pub credentials: ProviderCredentials,
    pub currency: Currency,
    pub store_name: Option<String>,
}

impl CheckoutSettings {
    /// Read settings from the store; `None` when nothing is stored.
    pub async fn load(store: &dyn SettingsStore) -> PaymentResult<Option<Self>> {
        let values = store.all().await?;
        if values.is_empty() {
            return Ok(None);
        }
        Self::from_map(&values).map(Some)
    }

    /// Parse from raw key/value pairs
    pub fn from_map(values: &HashMap<String, String>) -> PaymentResult<Self> {
        let get = |key: &str| values.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let checkout_enabled = get(keys::CHECKOUT_ENABLED)
            .map(parse_flag)
            .unwrap_or(false);

        let mode = get(keys::PAYPAL_MODE)
            .map(ProviderMode::from_str)
            .transpose();
        let currency = get(keys::CURRENCY)
            .map(Currency::from_str)
            .transpose()
            .map_err(PaymentError::Configuration);

        // Mode and currency are only validated once checkout is enabled
        let (mode, currency) = if checkout_enabled {
            (mode?, currency?)
        } else {
            (
                mode.unwrap_or_else(|e| {
                    warn!("Ignoring {} while checkout is disabled: {}", keys::PAYPAL_MODE, e);
                    None
                }),
                currency.unwrap_or_else(|e| {
                    warn!("Ignoring {} while checkout is disabled: {}", keys::CURRENCY, e);
                    None
                }),
            )
        };
        let mode = mode.unwrap_or(ProviderMode::Sandbox);
        let currency = currency.unwrap_or_default();

        Ok(Self {
            checkout_enabled,
            payment_provider: get(keys::PAYMENT_PROVIDER).map(|p| p.to_ascii_lowercase()),
            credentials: ProviderCredentials::new(
                get(keys::PAYPAL_CLIENT_ID).unwrap_or_default(),
                get(keys::PAYPAL_CLIENT_SECRET).unwrap_or_default(),
                mode,
            ),
            currency,
            store_name: get(keys::STORE_NAME).map(String::from),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_empty_store_is_none() {
        let store = InMemorySettings::new();
        assert!(CheckoutSettings::load(&store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_typed_settings() {
        let store = InMemorySettings::new()
            .with(keys::CHECKOUT_ENABLED, "true")
            .with(keys::PAYMENT_PROVIDER, "PayPal")
            .with(keys::PAYPAL_MODE, "live")
            .with(keys::PAYPAL_CLIENT_ID, "client")
            .with(keys::PAYPAL_CLIENT_SECRET, "secret")
            .with(keys::CURRENCY, "eur");

        let settings = CheckoutSettings::load(&store).await.unwrap().unwrap();
        assert!(settings.checkout_enabled);
        assert_eq!(settings.payment_provider.as_deref(), Some("paypal"));
        assert_eq!(settings.credentials.mode, ProviderMode::Live);
        assert_eq!(settings.currency, Currency::EUR);
        assert!(!settings.credentials.is_incomplete());
    }

    #[test]
    fn test_defaults_when_keys_missing() {
        let mut values = HashMap::new();
        values.insert(keys::CHECKOUT_ENABLED.to_string(), "false".to_string());

        let settings = CheckoutSettings::from_map(&values).unwrap();
        assert!(!settings.checkout_enabled);
        assert!(settings.payment_provider.is_none());
        assert_eq!(settings.credentials.mode, ProviderMode::Sandbox);
        assert!(settings.credentials.is_incomplete());
        assert_eq!(settings.currency, Currency::USD);
    }

    #[test]
    fn test_bad_mode_is_configuration_error() {
        let mut values = HashMap::new();
        values.insert(keys::CHECKOUT_ENABLED.to_string(), "true".to_string());
        values.insert(keys::PAYPAL_MODE.to_string(), "staging".to_string());
        let err = CheckoutSettings::from_map(&values).unwrap_err();
        assert!(err.is_configuration());

        values.insert(keys::PAYPAL_MODE.to_string(), "live".to_string());
        values.insert(keys::CURRENCY.to_string(), "XYZ".to_string());
        assert!(CheckoutSettings::from_map(&values).unwrap_err().is_configuration());
    }

    #[test]
    fn test_bad_values_ignored_while_disabled() {
        let mut values = HashMap::new();
        values.insert(keys::CHECKOUT_ENABLED.to_string(), "false".to_string());
        values.insert(keys::PAYPAL_MODE.to_string(), "staging".to_string());
        values.insert(keys::CURRENCY.to_string(), "XYZ".to_string());

        let settings = CheckoutSettings::from_map(&values).unwrap();
        assert!(!settings.checkout_enabled);
        assert_eq!(settings.credentials.mode, ProviderMode::Sandbox);
        assert_eq!(settings.currency, Currency::default());
    }

    #[tokio::test]
    async fn test_from_toml() {
        let store = InMemorySettings::from_toml(
            r#"
checkout_enabled = true
payment_provider = "paypal"
paypal_mode = "sandbox"
"#,
        )
        .unwrap();

        assert_eq!(
            store.get(keys::CHECKOUT_ENABLED).await.unwrap().as_deref(),
            Some("true")
        );
        assert!(InMemorySettings::from_toml("nested = { a = 1 }").is_err());
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let creds = ProviderCredentials::new("id", "hunter2", ProviderMode::Sandbox);
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
