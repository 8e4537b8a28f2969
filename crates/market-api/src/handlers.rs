//! # Request Handlers
//!
//! Axum request handlers for payment initiation, gateway callbacks,
//! and the order/analytics read side.

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Query, RawQuery, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use market_core::{
    CallbackAck, CallbackFields, GatewaySettings, GatewaySettingsUpdate, MarketStats, Order,
    OrderSummary, PaymentError, SettingsSource, StoreError,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Initiate payment query
#[derive(Debug, Deserialize)]
pub struct InitiatePaymentQuery {
    pub account_id: String,
}

/// Initiate payment response
#[derive(Debug, Serialize, Deserialize)]
pub struct InitiatePaymentResponse {
    pub success: bool,
    /// Hosted payment page (redirect user here)
    pub payment_url: String,
    pub order_id: String,
}

/// Gateway settings as shown to admins; the secret never leaves the server
#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub api_key: String,
    /// Masked secret, empty when unset
    pub api_secret: String,
    pub website_index: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub enable_card_payment: bool,
    /// Key and secret both present
    pub credentials_configured: bool,
}

const SECRET_MASK: &str = "********";

impl From<GatewaySettings> for SettingsResponse {
    fn from(settings: GatewaySettings) -> Self {
        let credentials_configured = settings.credentials().is_ok();
        let api_secret = if settings.api_secret.trim().is_empty() {
            String::new()
        } else {
            SECRET_MASK.to_string()
        };
        Self {
            api_key: settings.api_key,
            api_secret,
            website_index: settings.website_index,
            callback_url: settings.callback_url,
            enable_card_payment: settings.enable_card_payment,
            credentials_configured,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);
    if err.is_retryable() {
        response = response.with_details("retryable");
    }
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn store_error_to_response(err: StoreError) -> ApiError {
    error!("Store error: {}", err);
    payment_error_to_response(PaymentError::from(err))
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "account-market",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Start a Shopier payment for one account
#[instrument(skip(state, user, query), fields(account_id = %query.account_id, user_id = %user.id))]
pub async fn initiate_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<InitiatePaymentQuery>,
) -> Result<Json<InitiatePaymentResponse>, ApiError> {
    let initiated = state
        .service
        .initiate_payment(&query.account_id, &user.buyer())
        .await
        .map_err(|e| {
            error!("Failed to initiate payment: {}", e);
            payment_error_to_response(e)
        })?;

    info!("Payment initiated: order={}", initiated.order_id);

    Ok(Json(InitiatePaymentResponse {
        success: true,
        payment_url: initiated.redirect_url,
        order_id: initiated.order_id,
    }))
}

/// Handle a Shopier payment callback.
///
/// Fields come from the query string and/or a form-encoded body; query
/// values win on conflicts. Always answers 200 so the gateway stops retrying;
/// an unreadable body (e.g. over the size limit) leaves only the query fields.
/// The request is NOT authenticated: anyone who can reach this endpoint can
/// settle a pending order.
#[instrument(skip(state, query, body))]
pub async fn shopier_callback(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    body: Result<Bytes, BytesRejection>,
) -> Json<CallbackAck> {
    let mut fields = CallbackFields::new();

    if let Some(query) = query.as_deref() {
        match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(pairs) => fields.extend(pairs),
            Err(e) => warn!("Unparseable callback query: {}", e),
        }
    }

    match body {
        Ok(body) if !body.is_empty() => {
            match serde_urlencoded::from_bytes::<Vec<(String, String)>>(&body) {
                Ok(pairs) => fields.extend(pairs),
                Err(e) => warn!("Unparseable callback body: {}", e),
            }
        }
        Ok(_) => {}
        Err(e) => warn!("Unreadable callback body, using query only: {}", e),
    }

    Json(state.service.handle_callback(&fields).await.ack())
}

/// All orders with account names (admin)
pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    let orders = state
        .service
        .list_orders()
        .await
        .map_err(store_error_to_response)?;
    Ok(Json(orders))
}

/// Orders placed by the caller
pub async fn my_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = state
        .service
        .orders_for_user(&user.id)
        .await
        .map_err(store_error_to_response)?;
    Ok(Json(orders))
}

/// Account and order status counts (admin)
pub async fn settlement_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<MarketStats>, ApiError> {
    let stats = state.service.stats().await.map_err(store_error_to_response)?;
    Ok(Json(stats))
}

/// Current gateway settings (admin)
pub async fn get_settings(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<SettingsResponse>, ApiError> {
    let settings = state
        .settings
        .gateway_settings()
        .await
        .map_err(payment_error_to_response)?;
    Ok(Json(settings.into()))
}

/// Partially update gateway settings (admin)
#[instrument(skip(state, admin, update), fields(admin_id = %admin.0.id))]
pub async fn update_settings(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(update): Json<GatewaySettingsUpdate>,
) -> Result<Json<SettingsResponse>, ApiError> {
    if update.is_empty() {
        return Err(payment_error_to_response(PaymentError::InvalidRequest(
            "No fields to update".to_string(),
        )));
    }

    let settings = state.settings.apply(update).await;
    info!(
        credentials_configured = settings.credentials().is_ok(),
        enable_card_payment = settings.enable_card_payment,
        "Gateway settings updated"
    );

    Ok(Json(settings.into()))
}
