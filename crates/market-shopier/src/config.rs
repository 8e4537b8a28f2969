//! # Shopier Configuration
//!
//! Static client configuration for the Shopier integration. Credentials are
//! NOT part of it: they come from the settings collaborator per request.

use market_core::PaymentError;
use std::env;
use std::time::Duration;

/// Production initiation endpoint
pub const DEFAULT_API_URL: &str = "https://www.shopier.com/ShowProduct/api_pay4.php";

/// Baseline request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Shopier client configuration
#[derive(Debug, Clone)]
pub struct ShopierConfig {
    /// Initiation endpoint (overridable for testing/mocking)
    pub api_url: String,

    /// Upper bound on the whole initiation round trip
    pub timeout: Duration,

    /// ISO currency code sent with every order
    pub currency: String,

    /// Language of the hosted payment page
    pub language: String,

    /// Callback URL used when settings carry no override
    pub default_callback_url: String,
}

impl ShopierConfig {
    /// Load configuration from environment variables.
    ///
    /// `frontend_url` is the storefront base; the default callback URL is
    /// `{frontend_url}/payment/callback`.
    ///
    /// Optional env vars:
    /// - `SHOPIER_API_URL` (default: production endpoint)
    /// - `GATEWAY_TIMEOUT_SECS` (default: 30)
    /// - `SHOPIER_CURRENCY` (default: `TRY`)
    pub fn from_env(frontend_url: &str) -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let timeout_secs = match env::var("GATEWAY_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                PaymentError::Configuration(format!("GATEWAY_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let mut config = Self::new(default_callback_url(frontend_url))
            .with_timeout(Duration::from_secs(timeout_secs));

        if let Ok(url) = env::var("SHOPIER_API_URL") {
            config = config.with_api_url(url);
        }
        if let Ok(currency) = env::var("SHOPIER_CURRENCY") {
            config.currency = currency;
        }

        Ok(config)
    }

    /// Create config with explicit callback URL and defaults for the rest
    pub fn new(default_callback_url: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            currency: "TRY".to_string(),
            language: "tr".to_string(),
            default_callback_url: default_callback_url.into(),
        }
    }

    /// Builder: set custom API URL (for testing)
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn default_callback_url(frontend_url: &str) -> String {
    format!("{}/payment/callback", frontend_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShopierConfig::new("https://shop.example/payment/callback");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.currency, "TRY");
    }

    #[test]
    fn test_default_callback_url() {
        assert_eq!(
            default_callback_url("https://shop.example/"),
            "https://shop.example/payment/callback"
        );
        assert_eq!(
            default_callback_url("http://localhost:3000"),
            "http://localhost:3000/payment/callback"
        );
    }

    #[test]
    fn test_from_env_uses_given_frontend_url() {
        let config = ShopierConfig::from_env("https://shop.example/").unwrap();
        assert_eq!(
            config.default_callback_url,
            "https://shop.example/payment/callback"
        );
    }

    #[test]
    fn test_builders() {
        let config = ShopierConfig::new("cb")
            .with_api_url("http://127.0.0.1:9999/pay")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.api_url, "http://127.0.0.1:9999/pay");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
