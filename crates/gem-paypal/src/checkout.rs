//! # PayPal Orders v2
//!
//! Hosted PayPal checkout: a client-credentials token exchange, then an
//! order create or capture call with that token. A fresh token is fetched for
//! each call; nothing is cached between checkouts.

use crate::config::PayPalConfig;
use async_trait::async_trait;
use gem_core::{
    CaptureResult, PaymentError, PaymentResult, PaymentStrategy, Price, ProviderCredentials,
    ProviderOrder, ProviderOrderRequest,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "paypal";

/// PayPal checkout strategy
///
/// Sends the shopper to PayPal's approval page and captures the order when
/// they come back.
pub struct PayPalStrategy {
    config: PayPalConfig,
    client: Client,
}

impl PayPalStrategy {
    /// Create a new PayPal strategy
    pub fn new(config: PayPalConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Create with endpoint overrides from the environment
    pub fn from_env() -> Self {
        Self::new(PayPalConfig::from_env())
    }

    /// Builder: share an existing HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn base_url(&self, credentials: &ProviderCredentials) -> &str {
        self.config.api_base_url(credentials.mode)
    }

    /// Exchange the client credentials for a bearer token
    #[instrument(skip(self, credentials), fields(mode = ?credentials.mode))]
    async fn access_token(&self, credentials: &ProviderCredentials) -> PaymentResult<String> {
        let url = format!("{}/v1/oauth2/token", self.base_url(credentials));

        let response = self
            .client
            .post(&url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let token: PayPalTokenResponse = parse_response(response, "token").await?;
        debug!("Obtained PayPal access token");
        Ok(token.access_token)
    }

    fn build_order_body(request: &ProviderOrderRequest) -> PayPalOrderBody {
        let currency_code = request.currency.code();

        PayPalOrderBody {
            intent: "CAPTURE",
            purchase_units: vec![PayPalPurchaseUnit {
                reference_id: request.reference_id.clone(),
                amount: PayPalAmount {
                    currency_code,
                    value: request.total.to_decimal_string(),
                    breakdown: PayPalBreakdown {
                        item_total: PayPalMoney::from_price(&request.total),
                    },
                },
                items: request
                    .items
                    .iter()
                    .map(|item| PayPalItem {
                        name: item.name.clone(),
                        quantity: item.quantity.to_string(),
                        unit_amount: PayPalMoney::from_price(&item.unit_amount),
                    })
                    .collect(),
            }],
            application_context: PayPalApplicationContext {
                return_url: request.return_url.clone(),
                cancel_url: request.cancel_url.clone(),
                brand_name: request.brand_name.clone(),
                user_action: "PAY_NOW",
            },
        }
    }
}

#[async_trait]
impl PaymentStrategy for PayPalStrategy {
    #[instrument(skip(self, credentials, request), fields(reference_id = %request.reference_id))]
    async fn create_order(
        &self,
        credentials: &ProviderCredentials,
        request: &ProviderOrderRequest,
    ) -> PaymentResult<ProviderOrder> {
        if request.items.is_empty() {
            return Err(PaymentError::InvalidRequest(
                "Order has no items".to_string(),
            ));
        }

        let token = self.access_token(credentials).await?;
        let body = Self::build_order_body(request);

        debug!(
            "Creating PayPal order: {} items, total={} {}",
            body.purchase_units[0].items.len(),
            body.purchase_units[0].amount.value,
            body.purchase_units[0].amount.currency_code
        );

        let url = format!("{}/v2/checkout/orders", self.base_url(credentials));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let order: PayPalOrderResponse = parse_response(response, "create order").await?;

        let approval_url = order
            .links
            .iter()
            .find(|link| link.rel == "approve")
            .map(|link| link.href.clone())
            .ok_or_else(|| PaymentError::ProviderError {
                provider: PROVIDER.to_string(),
                message: format!("order {} has no approval link", order.id),
            })?;

        info!(
            "Created PayPal order: id={}, status={}",
            order.id, order.status
        );

        Ok(ProviderOrder {
            provider_order_id: order.id,
            approval_url,
        })
    }

    #[instrument(skip(self, credentials))]
    async fn capture_order(
        &self,
        credentials: &ProviderCredentials,
        provider_order_id: &str,
    ) -> PaymentResult<CaptureResult> {
        let token = self.access_token(credentials).await?;

        let url = format!(
            "{}/v2/checkout/orders/{}/capture",
            self.base_url(credentials),
            provider_order_id
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let capture: PayPalCaptureResponse = parse_response(response, "capture").await?;

        let capture_id = capture
            .purchase_units
            .iter()
            .flat_map(|unit| unit.payments.iter())
            .flat_map(|payments| payments.captures.iter())
            .map(|c| c.id.clone())
            .next();

        info!(
            "PayPal capture: order={}, status={}, capture={:?}",
            capture.id, capture.status, capture_id
        );

        Ok(CaptureResult {
            provider_order_id: capture.id,
            status: capture.status,
            capture_id,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn max_item_name_len(&self) -> usize {
        127
    }
}

/// Read the body, turn non-2xx into a provider error, parse the rest.
async fn parse_response<T: DeserializeOwned>(response: Response, call: &str) -> PaymentResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

    if !status.is_success() {
        error!("PayPal {} error: status={}, body={}", call, status, body);

        if let Ok(error_response) = serde_json::from_str::<PayPalErrorResponse>(&body) {
            if let Some(message) = error_response.message() {
                return Err(PaymentError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message: format!("HTTP {}: {}", status, message),
                });
            }
        }

        return Err(PaymentError::ProviderError {
            provider: PROVIDER.to_string(),
            message: format!("HTTP {}: {}", status, body),
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        PaymentError::Serialization(format!("Failed to parse PayPal {} response: {}", call, e))
    })
}

// =============================================================================
// PayPal API Types
// =============================================================================

#[derive(Debug, Serialize)]
struct PayPalOrderBody {
    intent: &'static str,
    purchase_units: Vec<PayPalPurchaseUnit>,
    application_context: PayPalApplicationContext,
}

#[derive(Debug, Serialize)]
struct PayPalPurchaseUnit {
    reference_id: String,
    amount: PayPalAmount,
    items: Vec<PayPalItem>,
}

#[derive(Debug, Serialize)]
struct PayPalAmount {
    currency_code: &'static str,
    value: String,
    breakdown: PayPalBreakdown,
}

#[derive(Debug, Serialize)]
struct PayPalBreakdown {
    item_total: PayPalMoney,
}

#[derive(Debug, Serialize)]
struct PayPalMoney {
    currency_code: &'static str,
    value: String,
}

impl PayPalMoney {
    fn from_price(price: &Price) -> Self {
        Self {
            currency_code: price.currency.code(),
            value: price.to_decimal_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PayPalItem {
    name: String,
    quantity: String,
    unit_amount: PayPalMoney,
}

#[derive(Debug, Serialize)]
struct PayPalApplicationContext {
    return_url: String,
    cancel_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    brand_name: Option<String>,
    user_action: &'static str,
}

#[derive(Debug, Deserialize)]
struct PayPalTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PayPalOrderResponse {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    links: Vec<PayPalLink>,
}

#[derive(Debug, Deserialize)]
struct PayPalLink {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct PayPalCaptureResponse {
    id: String,
    status: String,
    #[serde(default)]
    purchase_units: Vec<PayPalCapturedUnit>,
}

#[derive(Debug, Deserialize)]
struct PayPalCapturedUnit {
    #[serde(default)]
    payments: Option<PayPalPayments>,
}

#[derive(Debug, Deserialize)]
struct PayPalPayments {
    #[serde(default)]
    captures: Vec<PayPalCapture>,
}

#[derive(Debug, Deserialize)]
struct PayPalCapture {
    id: String,
}

/// Error body from the REST API, or `error_description` from the token endpoint
#[derive(Debug, Deserialize)]
struct PayPalErrorResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl PayPalErrorResponse {
    fn message(&self) -> Option<String> {
        match (&self.name, &self.message, &self.error_description) {
            (Some(name), Some(message), _) => Some(format!("{}: {}", name, message)),
            (None, Some(message), _) => Some(message.clone()),
            (_, None, Some(description)) => Some(description.clone()),
            _ => None,
        }
    }
}
