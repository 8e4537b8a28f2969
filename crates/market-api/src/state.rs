//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the settlement service, runtime gateway settings, and configuration.

use anyhow::Context;
use chrono::Utc;
use market_core::{
    Account, AccountStatus, BoxedPaymentGateway, Decimal, GatewaySettings, InMemoryStore,
    SettlementService, SharedSettings,
};
use market_shopier::{ShopierConfig, ShopierGateway};
use serde::Deserialize;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Storefront URL (default callback target lives under it)
    pub frontend_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Allowed CORS origins; empty means any
    pub cors_origins: Vec<String>,
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
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid socket address {}:{}", self.host, self.port))
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

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty() && *o != "*")
        .map(String::from)
        .collect()
}

/// Initial gateway settings from the environment.
///
/// Blank credentials are accepted here; initiation reports them per request.
pub fn gateway_settings_from_env() -> GatewaySettings {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

    let mut settings = GatewaySettings::new(
        var("SHOPIER_API_KEY").unwrap_or_default(),
        var("SHOPIER_API_SECRET").unwrap_or_default(),
    );
    if let Some(index) = var("SHOPIER_WEBSITE_INDEX") {
        settings = settings.with_website_index(index);
    }
    if let Some(url) = var("SHOPIER_CALLBACK_URL") {
        settings = settings.with_callback_url(url);
    }
    if let Some(flag) = var("ENABLE_CARD_PAYMENT") {
        settings.enable_card_payment = parse_flag(&flag);
    }
    settings
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Settlement workflow
    pub service: SettlementService,
    /// Runtime-mutable gateway settings read by the service
    pub settings: SharedSettings,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState backed by the Shopier gateway and the seeded in-memory store
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let accounts = load_account_catalog()?;
        let store = InMemoryStore::with_accounts(accounts);

        let gateway = ShopierConfig::from_env(&config.frontend_url)
            .and_then(ShopierGateway::new)
            .map_err(|e| anyhow::anyhow!("Failed to initialize Shopier: {}", e))?;

        let settings = SharedSettings::new(gateway_settings_from_env());

        Ok(Self::with_parts(
            store,
            Arc::new(gateway) as BoxedPaymentGateway,
            settings,
            config,
        ))
    }

    /// Assemble state from explicit collaborators
    pub fn with_parts(
        store: InMemoryStore,
        gateway: BoxedPaymentGateway,
        settings: SharedSettings,
        config: AppConfig,
    ) -> Self {
        let service = SettlementService::new(Arc::new(store), gateway, Arc::new(settings.clone()));
        Self {
            service,
            settings,
            config,
        }
    }
}

/// One entry of `config/accounts.toml`
#[derive(Debug, Deserialize)]
struct AccountSeed {
    id: String,
    category_id: String,
    name: String,
    price: Decimal,
    #[serde(default)]
    status: AccountStatus,
}

#[derive(Debug, Default, Deserialize)]
struct AccountCatalog {
    #[serde(default)]
    accounts: Vec<AccountSeed>,
}

impl AccountCatalog {
    fn into_accounts(self) -> anyhow::Result<Vec<Account>> {
        let now = Utc::now();
        self.accounts
            .into_iter()
            .map(|seed| {
                if seed.price <= Decimal::ZERO {
                    anyhow::bail!("account {} has non-positive price {}", seed.id, seed.price);
                }
                Ok(Account::new(seed.category_id, seed.name, seed.price)
                    .with_id(seed.id)
                    .with_status(seed.status, now))
            })
            .collect()
    }
}

/// Load the seed account catalog from config file
fn load_account_catalog() -> anyhow::Result<Vec<Account>> {
    let config_paths = [
        "config/accounts.toml",
        "../config/accounts.toml",
        "../../config/accounts.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let accounts = parse_account_catalog(&content)
                .with_context(|| format!("Failed to parse {}", path))?;
            tracing::info!("Loaded {} accounts from {}", accounts.len(), path);
            return Ok(accounts);
        }
    }

    tracing::warn!("No account catalog found, starting with an empty store");
    Ok(Vec::new())
}

fn parse_account_catalog(content: &str) -> anyhow::Result<Vec<Account>> {
    let catalog: AccountCatalog = toml::from_str(content)?;
    catalog.into_accounts()
}
