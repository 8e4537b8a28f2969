//! # Account Market
//!
//! Order and payment settlement server for the account marketplace.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export SHOPIER_API_KEY=...
//! export SHOPIER_API_SECRET=...
//! export FRONTEND_URL=https://shop.example
//!
//! # Run the server (LOG_FORMAT=json for structured logs)
//! account-market
//! ```

use market_api::{routes, state::AppState};
use market_core::SettingsSource;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment provider: {}", state.service.provider_name());

    let settings = state.settings.gateway_settings().await?;
    if settings.credentials().is_err() {
        warn!("Shopier credentials are not configured; payment initiation will fail");
    }
    if !settings.enable_card_payment {
        warn!("Card payment is disabled");
    }

    let app = routes::create_router(state);

    info!("Account market starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Pay: POST http://{}/api/payment/shopier?account_id=...", addr);
        info!("Callback: POST http://{}/api/payment/shopier/callback", addr);
        info!("Settings: GET/PUT http://{}/api/settings (admin)", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

fn print_banner() {
    println!(
        r#"
  Account Market
  ━━━━━━━━━━━━━━━━━━━━━━━
  Order & payment settlement
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
