//! # market-api
//!
//! HTTP API layer for the account marketplace.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Shopier payment initiation and callback endpoints
//! - Order listings and settlement analytics
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/payment/shopier?account_id=` | Start payment |
//! | POST | `/api/payment/shopier/callback` | Shopier callback |
//! | GET | `/api/orders` | All orders (admin) |
//! | GET | `/api/orders/my` | Caller's orders |
//! | GET | `/api/analytics/settlement` | Status counts (admin) |
//! | GET/PUT | `/api/settings` | Gateway settings, secret masked (admin) |

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
