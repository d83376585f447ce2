//! # Error Types
//!
//! Typed error handling for the gemcart storefront core.
//! All catalog, cart and checkout operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Core error type for storefront and payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Checkout is switched off in the store settings (or no settings exist)
    #[error("Checkout is currently disabled")]
    CheckoutDisabled,

    /// The configured payment provider is not one we can talk to
    #[error("Unsupported payment provider: {provider}")]
    UnsupportedProvider { provider: String },

    /// Provider credentials are blank
    #[error("Missing credentials for payment provider: {provider}")]
    MissingCredentials { provider: String },

    /// Other configuration errors (unreadable settings, bad values)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Variant not found for a product
    #[error("Variant not found: {variant_id}")]
    VariantNotFound { variant_id: String },

    /// Variant exists but cannot be purchased right now
    #[error("Variant is not available for purchase: {variant_id}")]
    VariantUnavailable { variant_id: String },

    /// Quantity outside the variant's allowed range
    #[error("Invalid quantity: {message}")]
    InvalidQuantity { message: String },

    /// Requested more than the tracked stock allows
    #[error("Insufficient stock for {variant_id}: requested {requested}, available {available}")]
    InsufficientStock {
        variant_id: String,
        requested: u32,
        available: i64,
    },

    /// Cart mixes currencies
    #[error("Currency mismatch: cart is {expected}, item is {found}")]
    CurrencyMismatch { expected: String, found: String },

    /// Checkout attempted with nothing in the cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Local order lookup failed
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Provider order creation failed
    #[error("Checkout creation failed: {0}")]
    CheckoutCreationFailed(String),

    /// Capture request failed before the provider reported a status
    #[error("Payment capture failed: {0}")]
    CaptureFailed(String),

    /// Provider reported a capture status other than COMPLETED
    #[error("Payment not completed: provider status {status}")]
    PaymentDeclined { status: String },

    /// Backing store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Returns true for errors detected from settings before any network call
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PaymentError::CheckoutDisabled
                | PaymentError::UnsupportedProvider { .. }
                | PaymentError::MissingCredentials { .. }
                | PaymentError::Configuration(_)
        )
    }

    /// Returns true for failures talking to the payment provider
    pub fn is_provider_communication(&self) -> bool {
        matches!(
            self,
            PaymentError::ProviderError { .. }
                | PaymentError::NetworkError(_)
                | PaymentError::CheckoutCreationFailed(_)
                | PaymentError::CaptureFailed(_)
        )
    }

    /// Message safe to show a shopper.
    ///
    /// Provider communication failures all read the same; declines carry the
    /// provider's status so the shopper knows the payment did not go through.
    pub fn shopper_message(&self) -> String {
        match self {
            e if e.is_provider_communication() => {
                "We could not reach the payment provider. Please try again.".to_string()
            }
            PaymentError::Store(_) | PaymentError::Internal(_) | PaymentError::Serialization(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::CheckoutDisabled => 503,
            PaymentError::UnsupportedProvider { .. } => 500,
            PaymentError::MissingCredentials { .. } => 500,
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::ProductNotFound { .. } => 404,
            PaymentError::VariantNotFound { .. } => 404,
            PaymentError::VariantUnavailable { .. } => 409,
            PaymentError::InvalidQuantity { .. } => 400,
            PaymentError::InsufficientStock { .. } => 409,
            PaymentError::CurrencyMismatch { .. } => 400,
            PaymentError::EmptyCart => 400,
            PaymentError::OrderNotFound { .. } => 404,
            PaymentError::ProviderError { .. } => 502,
            PaymentError::NetworkError(_) => 503,
            PaymentError::CheckoutCreationFailed(_) => 502,
            PaymentError::CaptureFailed(_) => 502,
            PaymentError::PaymentDeclined { .. } => 402,
            PaymentError::Store(_) => 500,
            PaymentError::Internal(_) => 500,
            PaymentError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for storefront operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors() {
        assert!(PaymentError::CheckoutDisabled.is_configuration());
        assert!(PaymentError::UnsupportedProvider {
            provider: "stripe".into()
        }
        .is_configuration());
        assert!(PaymentError::MissingCredentials {
            provider: "paypal".into()
        }
        .is_configuration());
        assert!(!PaymentError::NetworkError("timeout".into()).is_configuration());
    }

    #[test]
    fn test_shopper_message_is_generic_for_provider_failures() {
        let a = PaymentError::ProviderError {
            provider: "paypal".into(),
            message: "HTTP 401: invalid_client".into(),
        };
        let b = PaymentError::CheckoutCreationFailed("HTTP 500".into());
        assert_eq!(a.shopper_message(), b.shopper_message());
        assert!(!a.shopper_message().contains("invalid_client"));
    }

    #[test]
    fn test_declined_message_keeps_status() {
        let err = PaymentError::PaymentDeclined {
            status: "DECLINED".into(),
        };
        assert!(err.shopper_message().contains("DECLINED"));
        assert_eq!(err.status_code(), 402);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(PaymentError::EmptyCart.status_code(), 400);
        assert_eq!(
            PaymentError::ProductNotFound {
                product_id: "x".into()
            }
            .status_code(),
            404
        );
        assert_eq!(PaymentError::CheckoutDisabled.status_code(), 503);
    }
}
