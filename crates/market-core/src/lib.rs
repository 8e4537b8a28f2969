//! # market-core
//!
//! Order and payment settlement core for the account marketplace.
//!
//! This crate provides:
//! - `Account` and `Order` with their status lifecycles
//! - `PaymentGateway` trait for implementing payment providers
//! - `sign` / `to_minor_units` for gateway request authentication
//! - `AccountStore` / `OrderStore` ports and an `InMemoryStore` adapter
//! - `SettlementService`: payment initiation, settlement and callback ingestion
//! - `PaymentError` / `StoreError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use market_core::{Buyer, CallbackFields, SettlementService};
//!
//! let service = SettlementService::new(store, gateway, settings);
//!
//! // Buyer clicks "pay"
//! let initiated = service.initiate_payment("A1", &Buyer::new("u1")).await?;
//! // Redirect buyer to initiated.redirect_url
//!
//! // Later, the gateway calls back
//! let ack = service
//!     .handle_callback(&CallbackFields::from_pairs([
//!         ("platform_order_id", initiated.order_id.as_str()),
//!         ("status", "1"),
//!     ]))
//!     .await
//!     .ack();
//! ```

pub mod account;
pub mod callback;
pub mod error;
pub mod gateway;
pub mod order;
pub mod settlement;
pub mod signature;
pub mod store;

// Re-exports for convenience
pub use account::{Account, AccountStatus};
pub use callback::{
    AckResult, AckStatus, CallbackAck, CallbackFields, ORDER_ID_FIELDS, SUCCESS_INDICATOR_FIELDS,
    SUCCESS_VALUES,
};
pub use error::{PaymentError, PaymentResult, StoreError, StoreResult};
pub use gateway::{
    BoxedPaymentGateway, GatewaySettings, GatewaySettingsUpdate, PaymentGateway, SettingsSource,
    SharedSettings,
};
pub use order::{Buyer, InitiatedPayment, Order, OrderStatus, OrderSummary};
pub use settlement::{
    AccountCounts, MarketStats, OrderCounts, PaymentOutcome, Settlement, SettlementService,
};
pub use signature::{sign, to_minor_units};
pub use store::{AccountStore, CasOutcome, InMemoryStore, MarketStore, OrderStore};

pub use rust_decimal::Decimal;
