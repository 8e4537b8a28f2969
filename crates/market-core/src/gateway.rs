//! # Payment Gateway Trait
//!
//! Seam between the settlement workflow and a concrete payment provider.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  PaymentGateway (trait)                     │
//! │  ├── initiate()        -> redirect URL                      │
//! │  └── provider_name()   -> order payment_method tag          │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                 ┌──────────┴──────────┐
//!         ┌───────┴───────┐     ┌───────┴───────┐
//!         │ShopierGateway │     │  test doubles │
//!         └───────────────┘     └───────────────┘
//! ```
//!
//! Gateway credentials are not baked into the client: they come from the
//! [`SettingsSource`] collaborator on every request, since operators can
//! change them while the server is running.

use crate::account::Account;
use crate::error::{PaymentError, PaymentResult};
use crate::order::{Buyer, Order};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Gateway settings as held by the settings collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Gateway API key
    #[serde(default)]
    pub api_key: String,

    /// Gateway API secret (signature salt)
    #[serde(default)]
    pub api_secret: String,

    /// Merchant website index registered with the gateway
    #[serde(default = "default_website_index")]
    pub website_index: String,

    /// Overrides the client's default callback URL when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,

    /// Card payments switched on
    #[serde(default = "default_enabled")]
    pub enable_card_payment: bool,
}

fn default_website_index() -> String {
    "1".to_string()
}

fn default_enabled() -> bool {
    true
}

impl GatewaySettings {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            website_index: default_website_index(),
            callback_url: None,
            enable_card_payment: true,
        }
    }

    pub fn with_website_index(mut self, index: impl Into<String>) -> Self {
        self.website_index = index.into();
        self
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    /// Key and secret, or `Configuration` if either is blank
    pub fn credentials(&self) -> PaymentResult<(&str, &str)> {
        let key = self.api_key.trim();
        let secret = self.api_secret.trim();
        if key.is_empty() || secret.is_empty() {
            return Err(PaymentError::Configuration(
                "gateway api key/secret not configured".to_string(),
            ));
        }
        Ok((key, secret))
    }

    /// Callback URL override, falling back to `default`
    pub fn callback_url_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.callback_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(default)
    }
}

/// Partial settings change; `None` leaves a field as it is
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewaySettingsUpdate {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default)]
    pub website_index: Option<String>,
    /// An empty string clears the override
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub enable_card_payment: Option<bool>,
}

impl GatewaySettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.api_key.is_none()
            && self.api_secret.is_none()
            && self.website_index.is_none()
            && self.callback_url.is_none()
            && self.enable_card_payment.is_none()
    }
}

impl GatewaySettings {
    /// Merge a partial update into these settings
    pub fn apply(&mut self, update: GatewaySettingsUpdate) {
        if let Some(key) = update.api_key {
            self.api_key = key;
        }
        if let Some(secret) = update.api_secret {
            self.api_secret = secret;
        }
        if let Some(index) = update.website_index {
            self.website_index = index;
        }
        if let Some(url) = update.callback_url {
            self.callback_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(enabled) = update.enable_card_payment {
            self.enable_card_payment = enabled;
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::new("", "")
    }
}

/// Settings collaborator
#[async_trait]
pub trait SettingsSource: Send + Sync {
    /// Current gateway settings snapshot
    async fn gateway_settings(&self) -> PaymentResult<GatewaySettings>;
}

/// Runtime-mutable settings held in memory
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<GatewaySettings>>,
}

impl SharedSettings {
    pub fn new(settings: GatewaySettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Merge `update` under the write lock and return the new snapshot
    pub async fn apply(&self, update: GatewaySettingsUpdate) -> GatewaySettings {
        let mut current = self.inner.write().await;
        current.apply(update);
        current.clone()
    }
}

#[async_trait]
impl SettingsSource for SharedSettings {
    async fn gateway_settings(&self) -> PaymentResult<GatewaySettings> {
        Ok(self.inner.read().await.clone())
    }
}

/// Core trait for payment gateway clients.
///
/// Implementations translate every transport or protocol failure into a typed
/// [`PaymentError`]: `NetworkError`, `GatewayRejected` or `MalformedResponse`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Send the initiation request for `order` and return the URL the buyer
    /// must be redirected to.
    ///
    /// # Arguments
    /// * `order` - The already-persisted pending order
    /// * `account` - The account being bought
    /// * `buyer` - Buyer identity (optional fields may be absent)
    /// * `settings` - Gateway credentials and overrides
    async fn initiate(
        &self,
        order: &Order,
        account: &Account,
        buyer: &Buyer,
        settings: &GatewaySettings,
    ) -> PaymentResult<String>;

    /// Provider name, stored on orders as the payment method tag
    fn provider_name(&self) -> &'static str;

    /// Path the provider posts payment notifications to.
    /// Default: `/api/payment/{provider_name}/callback`
    fn callback_path(&self) -> String {
        format!("/api/payment/{}/callback", self.provider_name())
    }
}

/// Type alias for a boxed payment gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;
