//! # Callback Ingestion
//!
//! Turns asynchronous gateway notifications into settlement transitions.
//!
//! The gateway is not consistent about field names or encodings, so the
//! accepted spellings are listed once below and checked in order:
//!
//! | Purpose | Fields (priority order) | Accepted values |
//! |---|---|---|
//! | order correlator | `platform_order_id`, `order_id` | any non-empty |
//! | success indicator | `status`, `payment_status` | `success`, `1` (exact) |
//!
//! A notification is a success if ANY indicator field carries a success value;
//! anything else (including no indicator at all) is a failure. Values are
//! compared byte for byte: `SUCCESS` or ` 1 ` settle the order as failed.
//!
//! Gateways treat non-2xx responses as "retry later", so ingestion never
//! returns an error: every path ends in a [`CallbackAck`].
//!
//! SECURITY: notifications are trusted as received. The provider's callback
//! authentication contract is unknown, so no signature or shared-secret check
//! is performed here. Anyone who can reach the callback endpoint and guess a
//! pending order id can settle it.

use crate::order::OrderStatus;
use crate::settlement::{PaymentOutcome, Settlement, SettlementService};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info, instrument, warn};

/// Fields that may carry our order id, highest priority first
pub const ORDER_ID_FIELDS: &[&str] = &["platform_order_id", "order_id"];

/// Fields that may carry the success indicator, highest priority first
pub const SUCCESS_INDICATOR_FIELDS: &[&str] = &["status", "payment_status"];

/// Indicator values meaning "paid" (exact match)
pub const SUCCESS_VALUES: &[&str] = &["success", "1"];

/// Raw notification fields, merged from query string and form body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct CallbackFields {
    fields: HashMap<String, String>,
}

impl CallbackFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from key/value pairs. The first occurrence of a key wins.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = Self::new();
        fields.extend(pairs);
        fields
    }

    /// Add pairs without overwriting keys already present
    pub fn extend<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self.fields.entry(key.into()).or_insert_with(|| value.into());
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Order id under the first accepted alias that is present and non-empty
    pub fn order_id(&self) -> Option<&str> {
        ORDER_ID_FIELDS
            .iter()
            .filter_map(|field| self.get(field))
            .map(str::trim)
            .find(|id| !id.is_empty())
    }

    /// True if any accepted indicator field carries an accepted success value
    pub fn indicates_success(&self) -> bool {
        SUCCESS_INDICATOR_FIELDS
            .iter()
            .filter_map(|field| self.get(field))
            .any(|value| SUCCESS_VALUES.contains(&value))
    }

    pub fn outcome(&self) -> PaymentOutcome {
        if self.indicates_success() {
            PaymentOutcome::Succeeded
        } else {
            PaymentOutcome::Failed
        }
    }
}

/// Acknowledgment status in the fixed shape the gateway consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Ok,
    Error,
}

/// Body returned to the gateway, always with HTTP 200
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAck {
    pub status: AckStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CallbackAck {
    pub fn ok() -> Self {
        Self {
            status: AckStatus::Ok,
            message: None,
        }
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            status: AckStatus::Ok,
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: AckStatus::Error,
            message: Some(message.into()),
        }
    }
}

/// Everything callback handling can end in
#[derive(Debug, Clone, PartialEq)]
pub enum AckResult {
    /// This notification settled the order
    Settled { order_id: String, status: OrderStatus },
    /// Order was already terminal; notification ignored
    AlreadySettled { order_id: String, status: OrderStatus },
    /// No such order (or no order id at all); retrying will not help
    NotFound { order_id: Option<String> },
    /// Internal failure while processing
    Error(String),
}

impl AckResult {
    /// Normalize into the gateway-facing acknowledgment
    pub fn ack(&self) -> CallbackAck {
        match self {
            AckResult::Settled { .. } => CallbackAck::ok(),
            AckResult::AlreadySettled { .. } => CallbackAck::ok_with("order already settled"),
            AckResult::NotFound { .. } => CallbackAck::ok_with("order not found"),
            AckResult::Error(message) => CallbackAck::error(message.clone()),
        }
    }
}

impl SettlementService {
    /// Process one gateway notification.
    ///
    /// Never fails: unknown orders and internal errors are folded into the
    /// returned [`AckResult`].
    #[instrument(skip(self, notification), fields(order_id = notification.order_id().unwrap_or("")))]
    pub async fn handle_callback(&self, notification: &CallbackFields) -> AckResult {
        let Some(order_id) = notification.order_id() else {
            warn!("Callback without an order id");
            return AckResult::NotFound { order_id: None };
        };

        let outcome = notification.outcome();

        match self.settle(order_id, outcome).await {
            Ok(Settlement::Applied(order)) => {
                info!(status = %order.status, "Callback settled order");
                AckResult::Settled {
                    order_id: order.id,
                    status: order.status,
                }
            }
            Ok(Settlement::AlreadySettled(order)) => AckResult::AlreadySettled {
                order_id: order.id,
                status: order.status,
            },
            Ok(Settlement::UnknownOrder) => {
                warn!("Callback for unknown order");
                AckResult::NotFound {
                    order_id: Some(order_id.to_string()),
                }
            }
            Err(e) => {
                error!("Callback processing failed: {}", e);
                AckResult::Error(e.to_string())
            }
        }
    }
}
