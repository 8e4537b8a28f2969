//! # market-shopier
//!
//! Shopier hosted-payment gateway for the account marketplace.
//!
//! [`ShopierGateway`] implements `market_core::PaymentGateway`:
//!
//! - Converts the order amount to minor units and signs the request
//! - Posts the form-encoded initiation request to the Shopier API
//! - Returns the hosted payment page URL the buyer is redirected to
//!
//! Credentials are not held by the gateway. They arrive per request as
//! `GatewaySettings`, so a missing key surfaces as a `Configuration` error
//! on that request instead of at startup.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use market_shopier::{ShopierConfig, ShopierGateway};
//! use market_core::{GatewaySettings, PaymentGateway};
//!
//! let gateway = ShopierGateway::new(ShopierConfig::from_env("https://shop.example")?)?;
//! let settings = GatewaySettings::new(api_key, api_secret);
//!
//! let url = gateway.initiate(&order, &account, &buyer, &settings).await?;
//! // Redirect buyer to url
//! ```

pub mod checkout;
pub mod config;

// Re-exports
pub use checkout::{
    ShopierGateway, BUYER_NAME_PLACEHOLDER, BUYER_PHONE_PLACEHOLDER, PAYMENT_URL_FIELDS,
};
pub use config::ShopierConfig;
