//! # Order Types
//!
//! Orders are single checkout attempts against an account. The order id is
//! generated here, before the gateway is contacted, and doubles as the
//! correlation id the gateway echoes back in its callback.

use crate::account::Account;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, gateway outcome not yet known
    #[default]
    Pending,
    /// Gateway reported a successful payment
    Completed,
    /// Gateway reported a failed payment
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
        }
    }

    /// `completed` and `failed` never change again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A checkout attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID (generated, sent to the gateway as its order correlator)
    pub id: String,

    /// Account being bought (reference only)
    pub account_id: String,

    /// Buyer (reference only)
    pub user_id: String,

    /// Account price snapshot taken at initiation
    pub amount: Decimal,

    #[serde(default)]
    pub status: OrderStatus,

    /// Gateway tag, e.g. "shopier"
    pub payment_method: String,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Create a pending order for `account`, snapshotting its current price
    pub fn new(account: &Account, user_id: impl Into<String>, payment_method: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id: account.id.clone(),
            user_id: user_id.into(),
            amount: account.price,
            status: OrderStatus::Pending,
            payment_method: payment_method.into(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Apply a terminal transition. Only valid from `pending`.
    pub fn settle(&mut self, next: OrderStatus, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() || !next.is_terminal() {
            return false;
        }
        self.status = next;
        if next == OrderStatus::Completed {
            self.completed_at = Some(now);
        }
        true
    }
}

/// Identity of the buyer as handed over by the authentication collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Buyer {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Buyer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            phone: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Successful initiation: where to send the buyer, and the order to track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatedPayment {
    pub order_id: String,
    pub redirect_url: String,
}

/// Order listing entry for the admin view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,

    /// `None` when the account has since been removed from the catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}
