//! # Routes
//!
//! Axum router configuration for the marketplace API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET  /health
/// - POST /api/payment/shopier?account_id=... - Start payment (authenticated)
/// - POST {gateway callback_path} - Gateway callback (query and/or form body),
///   `/api/payment/shopier/callback` for Shopier
/// - GET  /api/orders - All orders (admin)
/// - GET  /api/orders/my - Caller's orders
/// - GET  /api/analytics/settlement - Status counts (admin)
/// - GET/PUT /api/settings - Gateway settings (admin)
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let callback_path = state.service.callback_path();

    let api_routes = Router::new()
        .route("/payment/shopier", post(handlers::initiate_payment))
        .route("/orders", get(handlers::list_orders))
        .route("/orders/my", get(handlers::my_orders))
        .route("/analytics/settlement", get(handlers::settlement_stats))
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        );

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api", api_routes)
        // Gateway callback stays outside any auth: Shopier calls it directly
        .route(&callback_path, post(handlers::shopier_callback))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let allow_origin = if allowed.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
