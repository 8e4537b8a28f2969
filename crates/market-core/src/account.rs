//! # Account Types
//!
//! Sellable catalog items. Accounts are provisioned by catalog management;
//! the settlement workflow only ever moves them `available -> pending`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sale lifecycle status of an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Listed and purchasable
    #[default]
    Available,
    /// Paid for, awaiting manual admin confirmation of delivery
    Pending,
    /// Sale finalized
    Sold,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Available => "available",
            AccountStatus::Pending => "pending",
            AccountStatus::Sold => "sold",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// `available -> pending -> sold`, plus `pending -> available` on rollback.
    /// `sold` is terminal.
    pub fn can_transition_to(&self, next: AccountStatus) -> bool {
        matches!(
            (self, next),
            (AccountStatus::Available, AccountStatus::Pending)
                | (AccountStatus::Pending, AccountStatus::Sold)
                | (AccountStatus::Pending, AccountStatus::Available)
        )
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sellable digital account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account ID
    pub id: String,

    /// Owning category
    pub category_id: String,

    /// Display name (sent to the gateway as the product name)
    pub name: String,

    /// Price in major units, currency-agnostic
    pub price: Decimal,

    #[serde(default)]
    pub status: AccountStatus,

    /// Monotonic view counter
    #[serde(default)]
    pub views: u64,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Set iff the account has reached `sold`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Create an available account with a generated ID
    pub fn new(category_id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            category_id: category_id.into(),
            name: name.into(),
            price,
            status: AccountStatus::Available,
            views: 0,
            created_at: Utc::now(),
            updated_at: None,
            sold_at: None,
        }
    }

    /// Builder: set an explicit ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Builder: start at `status` as catalog management left it.
    ///
    /// `sold_at` is stamped iff `status` is `sold`.
    pub fn with_status(mut self, status: AccountStatus, now: DateTime<Utc>) -> Self {
        self.status = status;
        self.updated_at = (status != AccountStatus::Available).then_some(now);
        self.sold_at = (status == AccountStatus::Sold).then_some(now);
        self
    }

    pub fn is_available(&self) -> bool {
        self.status == AccountStatus::Available
    }

    /// Prices must be strictly positive to be sold
    pub fn has_positive_price(&self) -> bool {
        self.price > Decimal::ZERO
    }

    /// Apply a status change, keeping `sold_at` in step.
    ///
    /// Returns `false` (and leaves the account untouched) when the lifecycle
    /// forbids the move.
    pub fn transition_to(&mut self, next: AccountStatus, now: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at = Some(now);
        if next == AccountStatus::Sold {
            self.sold_at = Some(now);
        }
        true
    }

    /// Admin confirmation of a sale: `pending -> sold`
    pub fn mark_sold(&mut self) -> bool {
        self.transition_to(AccountStatus::Sold, Utc::now())
    }

    /// Roll a reservation back: `pending -> available`
    pub fn release(&mut self) -> bool {
        self.transition_to(AccountStatus::Available, Utc::now())
    }
}
