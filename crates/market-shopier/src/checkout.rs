//! # Shopier Payment Initiation
//!
//! Sends the form-encoded initiation request and normalizes the provider's
//! answer into a redirect URL or a typed [`PaymentError`].

use crate::config::ShopierConfig;
use async_trait::async_trait;
use market_core::{
    sign, to_minor_units, Account, Buyer, GatewaySettings, Order, PaymentError, PaymentGateway,
    PaymentResult,
};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info, instrument};

/// Response fields that may hold the payment page URL, highest priority first.
/// Shopier does not use one consistent name.
pub const PAYMENT_URL_FIELDS: &[&str] = &["payment_url", "url", "redirect_url"];

/// Sent when the buyer has no usable name/email
pub const BUYER_NAME_PLACEHOLDER: &str = "Customer";

/// Sent when the buyer has no phone number on file
pub const BUYER_PHONE_PLACEHOLDER: &str = "0000000000";

/// Shopier `product_type` for digital goods
const PRODUCT_TYPE_DIGITAL: &str = "0";

const MODULE_VERSION: &str = "API-1.0";

/// Shopier hosted-payment gateway client
pub struct ShopierGateway {
    config: ShopierConfig,
    client: Client,
}

impl ShopierGateway {
    /// Create a new Shopier gateway client
    pub fn new(config: ShopierConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Build the form payload for the initiation request
    fn build_form(
        &self,
        order: &Order,
        account: &Account,
        buyer: &Buyer,
        settings: &GatewaySettings,
    ) -> PaymentResult<Vec<(&'static str, String)>> {
        let (api_key, api_secret) = settings.credentials()?;

        let amount = to_minor_units(order.amount).ok_or_else(|| {
            PaymentError::InvalidRequest(format!("amount out of range: {}", order.amount))
        })?;
        let signature = sign(api_key, &order.id, amount, api_secret);

        let buyer_name = non_blank(buyer.email.as_deref()).unwrap_or(BUYER_NAME_PLACEHOLDER);
        let buyer_phone = non_blank(buyer.phone.as_deref()).unwrap_or(BUYER_PHONE_PLACEHOLDER);
        let callback_url = settings.callback_url_or(&self.config.default_callback_url);

        Ok(vec![
            ("API_key", api_key.to_string()),
            ("website_index", settings.website_index.clone()),
            ("platform_order_id", order.id.clone()),
            ("product_name", account.name.clone()),
            ("product_type", PRODUCT_TYPE_DIGITAL.to_string()),
            ("buyer_name", buyer_name.to_string()),
            ("buyer_phone", buyer_phone.to_string()),
            ("buyer_account_age", "0".to_string()),
            ("buyer_id_nr", buyer.id.clone()),
            ("buyer_address", "Online".to_string()),
            ("total_order_value", amount.to_string()),
            ("currency", self.config.currency.clone()),
            ("platform", "API".to_string()),
            ("is_in_frame", "0".to_string()),
            ("current_language", self.config.language.clone()),
            ("modul_version", MODULE_VERSION.to_string()),
            // Shopier reads the request signature from `random_nr`
            ("random_nr", signature),
            ("callback_url", callback_url.to_string()),
        ])
    }
}

#[async_trait]
impl PaymentGateway for ShopierGateway {
    #[instrument(skip(self, order, account, buyer, settings), fields(order_id = %order.id))]
    async fn initiate(
        &self,
        order: &Order,
        account: &Account,
        buyer: &Buyer,
        settings: &GatewaySettings,
    ) -> PaymentResult<String> {
        let form = self.build_form(order, account, buyer, settings)?;

        debug!("Sending Shopier initiation request to {}", self.config.api_url);

        let response = self
            .client
            .post(&self.config.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Shopier API error: status={}, body={}", status, body);
            return Err(PaymentError::GatewayRejected {
                code: status.as_u16(),
            });
        }

        let payment_url = extract_payment_url(&body).ok_or_else(|| {
            error!("Shopier response without payment URL: body={}", body);
            PaymentError::MalformedResponse { raw: body.clone() }
        })?;

        info!("Shopier payment page ready: {}", payment_url);

        Ok(payment_url)
    }

    fn provider_name(&self) -> &'static str {
        "shopier"
    }
}

/// First non-empty string under one of [`PAYMENT_URL_FIELDS`]
fn extract_payment_url(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    PAYMENT_URL_FIELDS
        .iter()
        .filter_map(|field| json.get(field).and_then(Value::as_str))
        .map(str::trim)
        .find(|url| !url.is_empty())
        .map(String::from)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
