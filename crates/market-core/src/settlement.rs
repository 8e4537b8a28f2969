//! # Settlement State Machine
//!
//! Owns the order/account transition rules:
//!
//! ```text
//!   initiate            callback(success)                 callback(failure)
//!   ────────            ─────────────────                 ─────────────────
//!   Order  := pending   Order   pending -> completed      Order pending -> failed
//!   Account unchanged   Account available -> pending      Account unchanged
//! ```
//!
//! Terminal order states never change again. A callback for an order that is
//! already terminal is a no-op and never re-applies the account mutation.
//! `pending -> sold` on the account is an admin action outside this module.

use crate::account::AccountStatus;
use crate::error::{PaymentError, PaymentResult, StoreError, StoreResult};
use crate::gateway::{BoxedPaymentGateway, SettingsSource};
use crate::order::{Buyer, InitiatedPayment, Order, OrderStatus, OrderSummary};
use crate::store::{CasOutcome, MarketStore};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Payment result as reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

impl PaymentOutcome {
    /// Order status this outcome settles to
    pub fn order_status(&self) -> OrderStatus {
        match self {
            PaymentOutcome::Succeeded => OrderStatus::Completed,
            PaymentOutcome::Failed => OrderStatus::Failed,
        }
    }
}

/// What a settlement attempt did
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// This call performed the terminal transition
    Applied(Order),
    /// The order was already terminal; nothing changed
    AlreadySettled(Order),
    /// No order with that id exists
    UnknownOrder,
}

/// Per-status counts, exposed read-only for analytics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarketStats {
    pub accounts: AccountCounts,
    pub orders: OrderCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountCounts {
    pub available: usize,
    pub pending: usize,
    pub sold: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderCounts {
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Application service for the order and payment settlement workflow.
///
/// Collaborators are injected as trait objects so tests can swap in doubles
/// for the store, the gateway and the settings source.
#[derive(Clone)]
pub struct SettlementService {
    store: Arc<dyn MarketStore>,
    gateway: BoxedPaymentGateway,
    settings: Arc<dyn SettingsSource>,
}

impl SettlementService {
    pub fn new(
        store: Arc<dyn MarketStore>,
        gateway: BoxedPaymentGateway,
        settings: Arc<dyn SettingsSource>,
    ) -> Self {
        Self {
            store,
            gateway,
            settings,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &Arc<dyn MarketStore> {
        &self.store
    }

    /// Payment method tag of the configured gateway
    pub fn provider_name(&self) -> &'static str {
        self.gateway.provider_name()
    }

    /// Route the configured gateway posts its notifications to
    pub fn callback_path(&self) -> String {
        self.gateway.callback_path()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Initiation
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a checkout for `account_id` on behalf of `buyer`.
    ///
    /// The pending order is persisted before the gateway is contacted and is
    /// kept whatever the gateway call returns, so a timeout still leaves a
    /// record an operator can reconcile against the gateway.
    #[instrument(skip(self, buyer), fields(user_id = %buyer.id))]
    pub async fn initiate_payment(
        &self,
        account_id: &str,
        buyer: &Buyer,
    ) -> PaymentResult<InitiatedPayment> {
        let account = self
            .store
            .get_account(account_id)
            .await?
            .ok_or_else(|| PaymentError::AccountNotFound {
                account_id: account_id.to_string(),
            })?;

        if !account.is_available() {
            return Err(PaymentError::AccountUnavailable {
                account_id: account.id,
                status: account.status,
            });
        }

        if !account.has_positive_price() {
            return Err(PaymentError::InvalidRequest(format!(
                "account {} has non-positive price {}",
                account.id, account.price
            )));
        }

        let settings = self.settings.gateway_settings().await?;
        settings.credentials()?;

        if !settings.enable_card_payment {
            return Err(PaymentError::PaymentMethodDisabled {
                method: self.gateway.provider_name().to_string(),
            });
        }

        let order = Order::new(&account, &buyer.id, self.gateway.provider_name());
        self.store.insert_order(order.clone()).await?;

        info!(
            order_id = %order.id,
            amount = %order.amount,
            "Created pending order"
        );

        let redirect_url = self
            .gateway
            .initiate(&order, &account, buyer, &settings)
            .await
            .map_err(|e| {
                error!(order_id = %order.id, "Payment initiation failed: {}", e);
                e
            })?;

        info!(order_id = %order.id, "Payment initiated, redirecting buyer");

        Ok(InitiatedPayment {
            order_id: order.id,
            redirect_url,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Settlement
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply the terminal transition for `order_id`.
    ///
    /// The order moves only if it is still `pending` at the moment of the
    /// store's compare-and-set; concurrent or replayed deliveries therefore
    /// converge on the first terminal status, and only the winner touches
    /// the account.
    #[instrument(skip(self))]
    pub async fn settle(&self, order_id: &str, outcome: PaymentOutcome) -> StoreResult<Settlement> {
        let cas = self
            .store
            .compare_and_set_order_status(
                order_id,
                OrderStatus::Pending,
                outcome.order_status(),
                Utc::now(),
            )
            .await;

        let order = match cas {
            Ok(CasOutcome::Applied(order)) => order,
            Ok(CasOutcome::Conflict(order)) => {
                info!(status = %order.status, "Order already settled, ignoring");
                return Ok(Settlement::AlreadySettled(order));
            }
            Err(StoreError::NotFound { .. }) => return Ok(Settlement::UnknownOrder),
            Err(e) => return Err(e),
        };

        info!(status = %order.status, "Order settled");

        if outcome == PaymentOutcome::Succeeded {
            self.reserve_account(&order).await?;
        }

        Ok(Settlement::Applied(order))
    }

    /// `available -> pending`: paid, awaiting admin confirmation
    async fn reserve_account(&self, order: &Order) -> StoreResult<()> {
        let cas = self
            .store
            .compare_and_set_account_status(
                &order.account_id,
                AccountStatus::Available,
                AccountStatus::Pending,
            )
            .await;

        match cas {
            Ok(CasOutcome::Applied(_)) => {
                info!(account_id = %order.account_id, "Account awaiting sale confirmation");
            }
            Ok(CasOutcome::Conflict(account)) => {
                warn!(
                    account_id = %account.id,
                    status = %account.status,
                    "Paid order for an account that is no longer available"
                );
            }
            Err(StoreError::NotFound { .. }) => {
                warn!(account_id = %order.account_id, "Paid order references a deleted account");
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read side
    // ─────────────────────────────────────────────────────────────────────────

    /// All orders, newest first, with the account name attached
    pub async fn list_orders(&self) -> StoreResult<Vec<OrderSummary>> {
        let orders = self.store.list_orders().await?;
        let mut summaries = Vec::with_capacity(orders.len());
        for order in orders {
            let account_name = self
                .store
                .get_account(&order.account_id)
                .await?
                .map(|account| account.name);
            summaries.push(OrderSummary {
                order,
                account_name,
            });
        }
        Ok(summaries)
    }

    /// Orders placed by one buyer, newest first
    pub async fn orders_for_user(&self, user_id: &str) -> StoreResult<Vec<Order>> {
        self.store.list_orders_for_user(user_id).await
    }

    /// Status counts across accounts and orders
    pub async fn stats(&self) -> StoreResult<MarketStats> {
        let mut stats = MarketStats::default();

        for account in self.store.list_accounts().await? {
            match account.status {
                AccountStatus::Available => stats.accounts.available += 1,
                AccountStatus::Pending => stats.accounts.pending += 1,
                AccountStatus::Sold => stats.accounts.sold += 1,
            }
        }

        for order in self.store.list_orders().await? {
            match order.status {
                OrderStatus::Pending => stats.orders.pending += 1,
                OrderStatus::Completed => stats.orders.completed += 1,
                OrderStatus::Failed => stats.orders.failed += 1,
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::account::Account;
    use crate::gateway::{GatewaySettings, PaymentGateway, SharedSettings};
    use crate::store::{AccountStore, InMemoryStore, OrderStore};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Gateway double: records calls and replays a canned result
    pub struct FakeGateway {
        pub calls: AtomicUsize,
        pub response: Mutex<Option<PaymentResult<String>>>,
    }

    impl FakeGateway {
        pub fn redirecting_to(url: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Mutex::new(Some(Ok(url.to_string()))),
            }
        }

        pub fn failing_with(err: PaymentError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Mutex::new(Some(Err(err))),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn initiate(
            &self,
            _order: &Order,
            _account: &Account,
            _buyer: &Buyer,
            settings: &GatewaySettings,
        ) -> PaymentResult<String> {
            settings.credentials()?;
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(PaymentError::Internal("no canned response".into())))
        }

        fn provider_name(&self) -> &'static str {
            "shopier"
        }
    }

    pub fn service_with(
        store: InMemoryStore,
        gateway: Arc<FakeGateway>,
        settings: GatewaySettings,
    ) -> SettlementService {
        SettlementService::new(
            Arc::new(store),
            gateway,
            Arc::new(SharedSettings::new(settings)),
        )
    }

    fn account_a1() -> Account {
        Account::new("cat", "Account A1", dec!(100.00)).with_id("A1")
    }

    #[tokio::test]
    async fn test_initiate_creates_pending_order_and_keeps_account_available() {
        let store = InMemoryStore::with_accounts([account_a1()]);
        let gateway = Arc::new(FakeGateway::redirecting_to("https://pay.example/x"));
        let service = service_with(store.clone(), gateway.clone(), GatewaySettings::new("k", "s"));

        let initiated = service
            .initiate_payment("A1", &Buyer::new("u1"))
            .await
            .unwrap();

        assert_eq!(initiated.redirect_url, "https://pay.example/x");

        let order = store.get_order(&initiated.order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.amount, dec!(100.00));
        assert_eq!(order.payment_method, "shopier");

        let account = store.get_account("A1").await.unwrap().unwrap();
        assert_eq!(account.status, AccountStatus::Available);
    }

    #[tokio::test]
    async fn test_missing_credentials_never_calls_gateway() {
        let store = InMemoryStore::with_accounts([account_a1()]);
        let gateway = Arc::new(FakeGateway::redirecting_to("https://pay.example/x"));
        let service = service_with(store.clone(), gateway.clone(), GatewaySettings::default());

        let result = service.initiate_payment("A1", &Buyer::new("u1")).await;

        assert!(matches!(result, Err(PaymentError::Configuration(_))));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
        assert!(store.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_card_payment() {
        let store = InMemoryStore::with_accounts([account_a1()]);
        let gateway = Arc::new(FakeGateway::redirecting_to("https://pay.example/x"));
        let mut settings = GatewaySettings::new("k", "s");
        settings.enable_card_payment = false;
        let service = service_with(store.clone(), gateway.clone(), settings);

        let result = service.initiate_payment("A1", &Buyer::new("u1")).await;

        assert!(matches!(result, Err(PaymentError::PaymentMethodDisabled { .. })));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_positive_price_is_rejected_before_order_insert() {
        let mut free = Account::new("cat", "Free one", dec!(1.00)).with_id("F1");
        free.price = dec!(0);
        let mut negative = Account::new("cat", "Negative one", dec!(1.00)).with_id("N1");
        negative.price = dec!(-5.00);
        let store = InMemoryStore::with_accounts([free, negative]);
        let gateway = Arc::new(FakeGateway::redirecting_to("https://pay.example/x"));
        let service = service_with(store.clone(), gateway.clone(), GatewaySettings::new("k", "s"));

        for id in ["F1", "N1"] {
            let result = service.initiate_payment(id, &Buyer::new("u1")).await;
            assert!(matches!(result, Err(PaymentError::InvalidRequest(_))));
        }

        assert!(store.list_orders().await.unwrap().is_empty());
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_and_unavailable_accounts() {
        let sold = Account::new("cat", "Sold one", dec!(5.00))
            .with_id("S1")
            .with_status(AccountStatus::Sold, Utc::now());
        let store = InMemoryStore::with_accounts([sold]);
        let gateway = Arc::new(FakeGateway::redirecting_to("https://pay.example/x"));
        let service = service_with(store.clone(), gateway, GatewaySettings::new("k", "s"));

        let missing = service.initiate_payment("nope", &Buyer::new("u1")).await;
        assert!(matches!(missing, Err(PaymentError::AccountNotFound { .. })));

        let unavailable = service.initiate_payment("S1", &Buyer::new("u1")).await;
        assert!(matches!(
            unavailable,
            Err(PaymentError::AccountUnavailable {
                status: AccountStatus::Sold,
                ..
            })
        ));
        assert!(store.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_keeps_pending_order() {
        let store = InMemoryStore::with_accounts([account_a1()]);
        let gateway = Arc::new(FakeGateway::failing_with(PaymentError::NetworkError(
            "timed out".into(),
        )));
        let service = service_with(store.clone(), gateway, GatewaySettings::new("k", "s"));

        let result = service.initiate_payment("A1", &Buyer::new("u1")).await;
        assert!(matches!(result, Err(PaymentError::NetworkError(_))));

        let orders = store.list_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_success_then_failure_keeps_completed() {
        let store = InMemoryStore::with_accounts([account_a1()]);
        let gateway = Arc::new(FakeGateway::redirecting_to("https://pay.example/x"));
        let service = service_with(store.clone(), gateway, GatewaySettings::new("k", "s"));
        let initiated = service.initiate_payment("A1", &Buyer::new("u1")).await.unwrap();

        let first = service
            .settle(&initiated.order_id, PaymentOutcome::Succeeded)
            .await
            .unwrap();
        assert!(matches!(first, Settlement::Applied(ref o) if o.status == OrderStatus::Completed));

        let second = service
            .settle(&initiated.order_id, PaymentOutcome::Failed)
            .await
            .unwrap();
        assert!(matches!(second, Settlement::AlreadySettled(ref o) if o.status == OrderStatus::Completed));

        let account = store.get_account("A1").await.unwrap().unwrap();
        assert_eq!(account.status, AccountStatus::Pending);
    }

    #[tokio::test]
    async fn test_duplicate_success_mutates_account_once() {
        let store = InMemoryStore::with_accounts([account_a1()]);
        let gateway = Arc::new(FakeGateway::redirecting_to("https://pay.example/x"));
        let service = service_with(store.clone(), gateway, GatewaySettings::new("k", "s"));
        let initiated = service.initiate_payment("A1", &Buyer::new("u1")).await.unwrap();

        service
            .settle(&initiated.order_id, PaymentOutcome::Succeeded)
            .await
            .unwrap();
        let after_first = store.get_account("A1").await.unwrap().unwrap();

        // Admin rolls the reservation back; a replayed callback must not redo it.
        store
            .compare_and_set_account_status("A1", AccountStatus::Pending, AccountStatus::Available)
            .await
            .unwrap();

        let replay = service
            .settle(&initiated.order_id, PaymentOutcome::Succeeded)
            .await
            .unwrap();
        assert!(matches!(replay, Settlement::AlreadySettled(_)));

        let account = store.get_account("A1").await.unwrap().unwrap();
        assert_eq!(after_first.status, AccountStatus::Pending);
        assert_eq!(account.status, AccountStatus::Available);
    }

    #[tokio::test]
    async fn test_failure_leaves_account_untouched() {
        let store = InMemoryStore::with_accounts([account_a1()]);
        let gateway = Arc::new(FakeGateway::redirecting_to("https://pay.example/x"));
        let service = service_with(store.clone(), gateway, GatewaySettings::new("k", "s"));
        let initiated = service.initiate_payment("A1", &Buyer::new("u1")).await.unwrap();

        let settled = service
            .settle(&initiated.order_id, PaymentOutcome::Failed)
            .await
            .unwrap();

        match settled {
            Settlement::Applied(order) => {
                assert_eq!(order.status, OrderStatus::Failed);
                assert!(order.completed_at.is_none());
            }
            other => panic!("unexpected settlement: {:?}", other),
        }
        let account = store.get_account("A1").await.unwrap().unwrap();
        assert_eq!(account.status, AccountStatus::Available);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let service = service_with(
            InMemoryStore::new(),
            Arc::new(FakeGateway::redirecting_to("https://pay.example/x")),
            GatewaySettings::new("k", "s"),
        );

        let settled = service.settle("missing", PaymentOutcome::Succeeded).await.unwrap();
        assert_eq!(settled, Settlement::UnknownOrder);
    }

    #[tokio::test]
    async fn test_success_for_deleted_account_still_completes_order() {
        let store = InMemoryStore::new();
        let order = Order::new(&account_a1(), "u1", "shopier");
        let order_id = order.id.clone();
        store.insert_order(order).await.unwrap();
        let service = service_with(
            store,
            Arc::new(FakeGateway::redirecting_to("https://pay.example/x")),
            GatewaySettings::new("k", "s"),
        );

        let settled = service.settle(&order_id, PaymentOutcome::Succeeded).await.unwrap();
        assert!(matches!(settled, Settlement::Applied(ref o) if o.status == OrderStatus::Completed));
    }

    #[tokio::test]
    async fn test_listing_and_stats() {
        let store = InMemoryStore::with_accounts([account_a1()]);
        let gateway = Arc::new(FakeGateway::redirecting_to("https://pay.example/x"));
        let service = service_with(store.clone(), gateway, GatewaySettings::new("k", "s"));
        let initiated = service.initiate_payment("A1", &Buyer::new("u1")).await.unwrap();
        service
            .settle(&initiated.order_id, PaymentOutcome::Succeeded)
            .await
            .unwrap();

        let summaries = service.list_orders().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].account_name.as_deref(), Some("Account A1"));

        assert_eq!(service.orders_for_user("u1").await.unwrap().len(), 1);
        assert!(service.orders_for_user("u2").await.unwrap().is_empty());

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.accounts.pending, 1);
        assert_eq!(stats.orders.completed, 1);
        assert_eq!(stats.orders.pending, 0);
    }
}
