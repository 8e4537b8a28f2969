//! # Account/Order Store
//!
//! Ports for the persistence collaborator plus an in-memory adapter.
//!
//! The only cross-request synchronization in the settlement workflow is the
//! compare-and-set primitive exposed here. Implementations MUST perform the
//! status comparison and the write as a single atomic operation.

use crate::account::{Account, AccountStatus};
use crate::error::{StoreError, StoreResult};
use crate::order::{Order, OrderStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Result of a compare-and-set
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome<T> {
    /// Status matched and the write happened; holds the updated record
    Applied(T),
    /// Status did not match; holds the record as currently stored
    Conflict(T),
}

impl<T> CasOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, CasOutcome::Applied(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            CasOutcome::Applied(t) | CasOutcome::Conflict(t) => t,
        }
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, id: &str) -> StoreResult<Option<Account>>;

    async fn insert_account(&self, account: Account) -> StoreResult<()>;

    async fn list_accounts(&self) -> StoreResult<Vec<Account>>;

    /// Set `status := next` iff the current status equals `expected`.
    ///
    /// Fails with `NotFound` for unknown ids and `IllegalTransition` when the
    /// account lifecycle forbids `expected -> next`.
    async fn compare_and_set_account_status(
        &self,
        id: &str,
        expected: AccountStatus,
        next: AccountStatus,
    ) -> StoreResult<CasOutcome<Account>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>>;

    /// Insert a new order. Fails with `Duplicate` if the id exists.
    async fn insert_order(&self, order: Order) -> StoreResult<()>;

    /// All orders, newest first
    async fn list_orders(&self) -> StoreResult<Vec<Order>>;

    /// Orders placed by `user_id`, newest first
    async fn list_orders_for_user(&self, user_id: &str) -> StoreResult<Vec<Order>> {
        Ok(self
            .list_orders()
            .await?
            .into_iter()
            .filter(|order| order.user_id == user_id)
            .collect())
    }

    /// Move an order to a terminal status iff it is currently `expected`.
    /// `completed_at` is stamped with `at` when `next` is `Completed`.
    async fn compare_and_set_order_status(
        &self,
        id: &str,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<CasOutcome<Order>>;
}

/// Both halves of the store collaborator behind one handle
pub trait MarketStore: AccountStore + OrderStore {}

impl<T: AccountStore + OrderStore> MarketStore for T {}

/// A thread-safe in-memory store for accounts and orders.
///
/// Every compare-and-set runs under the write half of a `tokio::sync::RwLock`,
/// which makes it atomic with respect to other writers.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `accounts`
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let map = accounts
            .into_iter()
            .map(|account| (account.id.clone(), account))
            .collect();
        Self {
            accounts: Arc::new(RwLock::new(map)),
            orders: Arc::default(),
        }
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn get_account(&self, id: &str) -> StoreResult<Option<Account>> {
        Ok(self.accounts.read().await.get(id).cloned())
    }

    async fn insert_account(&self, account: Account) -> StoreResult<()> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.id) {
            return Err(StoreError::Duplicate { id: account.id });
        }
        accounts.insert(account.id.clone(), account);
        Ok(())
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        Ok(self.accounts.read().await.values().cloned().collect())
    }

    async fn compare_and_set_account_status(
        &self,
        id: &str,
        expected: AccountStatus,
        next: AccountStatus,
    ) -> StoreResult<CasOutcome<Account>> {
        if !expected.can_transition_to(next) {
            return Err(StoreError::IllegalTransition {
                from: expected.to_string(),
                to: next.to_string(),
            });
        }

        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        if account.status != expected {
            return Ok(CasOutcome::Conflict(account.clone()));
        }

        account.transition_to(next, Utc::now());
        Ok(CasOutcome::Applied(account.clone()))
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn insert_order(&self, order: Order) -> StoreResult<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::Duplicate { id: order.id });
        }
        orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let mut orders: Vec<Order> = self.orders.read().await.values().cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn compare_and_set_order_status(
        &self,
        id: &str,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<CasOutcome<Order>> {
        if expected.is_terminal() || !next.is_terminal() {
            return Err(StoreError::IllegalTransition {
                from: expected.to_string(),
                to: next.to_string(),
            });
        }

        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        if order.status != expected {
            return Ok(CasOutcome::Conflict(order.clone()));
        }

        order.settle(next, at);
        Ok(CasOutcome::Applied(order.clone()))
    }
}
