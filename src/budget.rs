//! Budget governance for commerce actions.
//!
//! The spend ledger is the one piece of mutable shared state that needs a
//! serialized read-check-write: computing current spend, checking it
//! against the limit, and appending the new transaction must happen under
//! a per-tenant lock so two concurrent transfers cannot both pass the
//! check and together exceed the limit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::model::{
    BudgetConfig, TenantId, TraceId, TransactionRecord, TransactionStatus,
    DEFAULT_DAILY_LIMIT_USD_CENTS,
};

/// Errors surfaced by commerce operations.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// The transfer would push cumulative daily spend over the limit. The
    /// wrapped action never ran.
    #[error(
        "daily budget exceeded for tenant '{tenant_id}': \
         {current_spend_usd_cents}c spent + {amount_usd_cents}c requested > {daily_limit_usd_cents}c limit"
    )]
    BudgetExceeded {
        tenant_id: String,
        amount_usd_cents: i64,
        current_spend_usd_cents: i64,
        daily_limit_usd_cents: i64,
    },
    #[error("unknown wallet '{0}'")]
    UnknownWallet(String),
    #[error("commerce backend error: {0}")]
    Backend(String),
}

/// Port for financial operations executed by an external backend.
#[async_trait]
pub trait CommercePort: Send + Sync {
    /// Execute an asset transfer. `amount_usd_cents` is the USD value of
    /// the transfer.
    async fn transfer_asset(
        &self,
        agent_id: &str,
        tenant_id: &TenantId,
        amount_usd_cents: i64,
        asset: &str,
        destination: &str,
        trace_id: &TraceId,
    ) -> Result<TransactionRecord, CommerceError>;

    /// Balance of a wallet, in the asset's smallest unit.
    async fn get_balance(&self, wallet_id: &str, asset: &str) -> Result<i64, CommerceError>;

    /// Total EXECUTED spend for the current UTC day, in USD cents.
    async fn get_current_spend(&self, tenant_id: &TenantId) -> Result<i64, CommerceError>;
}

/// Policy for financial budget enforcement.
#[derive(Debug, Clone, Copy)]
pub struct CfoJudge {
    daily_limit_usd_cents: i64,
}

impl Default for CfoJudge {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_LIMIT_USD_CENTS)
    }
}

impl CfoJudge {
    pub fn new(daily_limit_usd_cents: i64) -> Self {
        Self {
            daily_limit_usd_cents,
        }
    }

    /// Approve iff the transaction fits within the daily budget.
    ///
    /// The boundary is inclusive: a transaction bringing cumulative spend
    /// to exactly the limit is approved; anything beyond is rejected.
    pub fn validate_transaction(
        &self,
        amount_usd_cents: i64,
        current_spend_usd_cents: i64,
    ) -> bool {
        current_spend_usd_cents + amount_usd_cents <= self.daily_limit_usd_cents
    }
}

/// Append-only per-tenant transaction ledger.
#[derive(Clone, Default)]
pub struct SpendLedger {
    records: Arc<RwLock<HashMap<String, Vec<TransactionRecord>>>>,
}

impl SpendLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, record: TransactionRecord) {
        let mut records = self.records.write().await;
        records
            .entry(record.tenant_id.as_str().to_string())
            .or_default()
            .push(record);
    }

    /// Sum of EXECUTED amounts for the tenant within the given UTC day.
    pub async fn spend_for_day(&self, tenant_id: &TenantId, day: DateTime<Utc>) -> i64 {
        let records = self.records.read().await;
        records
            .get(tenant_id.as_str())
            .map(|entries| {
                entries
                    .iter()
                    .filter(|r| r.status == TransactionStatus::Executed)
                    .filter(|r| r.timestamp.date_naive() == day.date_naive())
                    .map(|r| r.amount_usd_cents)
                    .sum()
            })
            .unwrap_or(0)
    }

    pub async fn records_for(&self, tenant_id: &TenantId) -> Vec<TransactionRecord> {
        let records = self.records.read().await;
        records.get(tenant_id.as_str()).cloned().unwrap_or_default()
    }
}

/// Per-tenant budget configuration store.
#[derive(Clone)]
pub struct BudgetStore {
    configs: Arc<RwLock<HashMap<String, BudgetConfig>>>,
    default_limit_usd_cents: i64,
}

impl Default for BudgetStore {
    fn default() -> Self {
        Self {
            configs: Arc::new(RwLock::new(HashMap::new())),
            default_limit_usd_cents: DEFAULT_DAILY_LIMIT_USD_CENTS,
        }
    }
}

impl BudgetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose default limit comes from engine configuration.
    pub fn from_config(config: &crate::config::EngineConfig) -> Self {
        Self {
            configs: Arc::new(RwLock::new(HashMap::new())),
            default_limit_usd_cents: config.daily_limit_usd_cents,
        }
    }

    pub async fn set(&self, config: BudgetConfig) {
        let mut configs = self.configs.write().await;
        configs.insert(config.tenant_id.as_str().to_string(), config);
    }

    /// Config for the tenant; the store default applies when none was set.
    pub async fn get_or_default(&self, tenant_id: &TenantId) -> BudgetConfig {
        let configs = self.configs.read().await;
        configs.get(tenant_id.as_str()).cloned().unwrap_or_else(|| {
            BudgetConfig::new(tenant_id.clone()).with_daily_limit(self.default_limit_usd_cents)
        })
    }
}

/// Budget-enforcing decorator over a [`CommercePort`].
///
/// Every transfer runs the guard synchronously before the wrapped action:
/// check current spend, validate against the limit, then execute and append
/// to the ledger. Rejections append a REJECTED record and surface as
/// [`CommerceError::BudgetExceeded`]; the inner port is never called.
pub struct GovernedCommerce {
    inner: Arc<dyn CommercePort>,
    ledger: SpendLedger,
    budgets: BudgetStore,
    tenant_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl GovernedCommerce {
    pub fn new(inner: Arc<dyn CommercePort>) -> Self {
        Self {
            inner,
            ledger: SpendLedger::new(),
            budgets: BudgetStore::new(),
            tenant_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_budgets(mut self, budgets: BudgetStore) -> Self {
        self.budgets = budgets;
        self
    }

    pub fn ledger(&self) -> &SpendLedger {
        &self.ledger
    }

    async fn tenant_lock(&self, tenant_id: &TenantId) -> Arc<Mutex<()>> {
        let mut locks = self.tenant_locks.lock().await;
        locks
            .entry(tenant_id.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl CommercePort for GovernedCommerce {
    async fn transfer_asset(
        &self,
        agent_id: &str,
        tenant_id: &TenantId,
        amount_usd_cents: i64,
        asset: &str,
        destination: &str,
        trace_id: &TraceId,
    ) -> Result<TransactionRecord, CommerceError> {
        // Serialize check-then-append per tenant.
        let lock = self.tenant_lock(tenant_id).await;
        let _guard = lock.lock().await;

        let config = self.budgets.get_or_default(tenant_id).await;
        if config.is_active {
            let current_spend = self.ledger.spend_for_day(tenant_id, Utc::now()).await;
            let cfo = CfoJudge::new(config.daily_limit_usd_cents);
            if !cfo.validate_transaction(amount_usd_cents, current_spend) {
                let record = TransactionRecord::rejected(
                    tenant_id.clone(),
                    trace_id.clone(),
                    agent_id,
                    "transfer_asset",
                    asset,
                    amount_usd_cents,
                    "budget_exceeded",
                );
                self.ledger.append(record).await;
                warn!(
                    tenant_id = %tenant_id,
                    trace_id = %trace_id,
                    amount_usd_cents,
                    current_spend_usd_cents = current_spend,
                    daily_limit_usd_cents = config.daily_limit_usd_cents,
                    "commerce.budget_exceeded"
                );
                return Err(CommerceError::BudgetExceeded {
                    tenant_id: tenant_id.to_string(),
                    amount_usd_cents,
                    current_spend_usd_cents: current_spend,
                    daily_limit_usd_cents: config.daily_limit_usd_cents,
                });
            }
        }

        let record = self
            .inner
            .transfer_asset(
                agent_id,
                tenant_id,
                amount_usd_cents,
                asset,
                destination,
                trace_id,
            )
            .await?;
        self.ledger.append(record.clone()).await;
        info!(
            tenant_id = %tenant_id,
            trace_id = %trace_id,
            amount_usd_cents,
            asset,
            status = %record.status,
            "commerce.transfer"
        );
        Ok(record)
    }

    async fn get_balance(&self, wallet_id: &str, asset: &str) -> Result<i64, CommerceError> {
        self.inner.get_balance(wallet_id, asset).await
    }

    async fn get_current_spend(&self, tenant_id: &TenantId) -> Result<i64, CommerceError> {
        Ok(self.ledger.spend_for_day(tenant_id, Utc::now()).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tenant() -> TenantId {
        TenantId::new("t_acme").unwrap()
    }

    #[test]
    fn test_cfo_judge_approves_within_limit() {
        let judge = CfoJudge::new(10_000);
        assert!(judge.validate_transaction(5_000, 2_000));
    }

    #[test]
    fn test_cfo_judge_rejects_over_limit() {
        let judge = CfoJudge::new(10_000);
        assert!(!judge.validate_transaction(6_000, 5_000));
    }

    #[test]
    fn test_cfo_judge_rejects_when_exactly_at_limit() {
        let judge = CfoJudge::new(10_000);
        // Limit already consumed: any further amount is rejected.
        assert!(!judge.validate_transaction(100, 10_000));
    }

    #[test]
    fn test_cfo_judge_approves_spend_reaching_limit_exactly() {
        let judge = CfoJudge::new(10_000);
        assert!(judge.validate_transaction(8_000, 2_000));
    }

    /// Backend that records how often it executed.
    struct CountingBackend {
        calls: AtomicUsize,
    }

    impl CountingBackend {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CommercePort for CountingBackend {
        async fn transfer_asset(
            &self,
            agent_id: &str,
            tenant_id: &TenantId,
            amount_usd_cents: i64,
            asset: &str,
            _destination: &str,
            trace_id: &TraceId,
        ) -> Result<TransactionRecord, CommerceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TransactionRecord::executed(
                tenant_id.clone(),
                trace_id.clone(),
                agent_id,
                "transfer_asset",
                asset,
                amount_usd_cents,
            ))
        }

        async fn get_balance(&self, _wallet_id: &str, _asset: &str) -> Result<i64, CommerceError> {
            Ok(0)
        }

        async fn get_current_spend(&self, _tenant_id: &TenantId) -> Result<i64, CommerceError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_transfer_within_budget_executes_and_records() {
        let backend = Arc::new(CountingBackend::new());
        let commerce = GovernedCommerce::new(backend.clone());

        let record = commerce
            .transfer_asset("agent_1", &tenant(), 5_000, "USDC", "0x123", &TraceId::generate())
            .await
            .unwrap();

        assert_eq!(record.status, TransactionStatus::Executed);
        assert_eq!(record.amount_usd_cents, 5_000);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(commerce.get_current_spend(&tenant()).await.unwrap(), 5_000);
    }

    #[tokio::test]
    async fn test_transfer_exceeding_budget_is_rejected_before_backend() {
        let backend = Arc::new(CountingBackend::new());
        let commerce = GovernedCommerce::new(backend.clone());

        commerce
            .transfer_asset("agent_1", &tenant(), 9_500, "USDC", "0x123", &TraceId::generate())
            .await
            .unwrap();

        let outcome = commerce
            .transfer_asset("agent_1", &tenant(), 1_000, "USDC", "0x123", &TraceId::generate())
            .await;

        assert!(matches!(
            outcome,
            Err(CommerceError::BudgetExceeded {
                current_spend_usd_cents: 9_500,
                amount_usd_cents: 1_000,
                ..
            })
        ));
        // The backend only ever saw the first transfer.
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        // The rejection is on the ledger but does not count as spend.
        let records = commerce.ledger().records_for(&tenant()).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].status, TransactionStatus::Rejected);
        assert_eq!(records[1].rejection_reason.as_deref(), Some("budget_exceeded"));
        assert_eq!(commerce.get_current_spend(&tenant()).await.unwrap(), 9_500);
    }

    #[tokio::test]
    async fn test_spend_reaching_limit_exactly_is_approved() {
        let backend = Arc::new(CountingBackend::new());
        let commerce = GovernedCommerce::new(backend);

        commerce
            .transfer_asset("agent_1", &tenant(), 2_000, "USDC", "0x1", &TraceId::generate())
            .await
            .unwrap();
        let record = commerce
            .transfer_asset("agent_1", &tenant(), 8_000, "USDC", "0x1", &TraceId::generate())
            .await
            .unwrap();

        assert_eq!(record.status, TransactionStatus::Executed);
        assert_eq!(commerce.get_current_spend(&tenant()).await.unwrap(), 10_000);
    }

    #[tokio::test]
    async fn test_inactive_budget_disables_enforcement() {
        let backend = Arc::new(CountingBackend::new());
        let budgets = BudgetStore::new();
        let mut config = BudgetConfig::new(tenant()).with_daily_limit(100);
        config.is_active = false;
        budgets.set(config).await;

        let commerce = GovernedCommerce::new(backend).with_budgets(budgets);
        let record = commerce
            .transfer_asset("agent_1", &tenant(), 50_000, "USDC", "0x1", &TraceId::generate())
            .await
            .unwrap();
        assert_eq!(record.status, TransactionStatus::Executed);
    }

    #[tokio::test]
    async fn test_budget_store_default_limit_from_config() {
        let mut config = crate::config::EngineConfig::default();
        config.daily_limit_usd_cents = 500;
        let budgets = BudgetStore::from_config(&config);

        let commerce =
            GovernedCommerce::new(Arc::new(CountingBackend::new())).with_budgets(budgets);
        let outcome = commerce
            .transfer_asset("agent_1", &tenant(), 600, "USDC", "0x1", &TraceId::generate())
            .await;
        assert!(matches!(outcome, Err(CommerceError::BudgetExceeded { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_transfers_cannot_jointly_exceed_limit() {
        let backend = Arc::new(CountingBackend::new());
        let commerce = Arc::new(GovernedCommerce::new(backend.clone()));

        // Ten concurrent transfers of 2000c against a 10000c limit: exactly
        // five may pass regardless of interleaving.
        let mut handles = Vec::new();
        for i in 0..10 {
            let commerce = Arc::clone(&commerce);
            handles.push(tokio::spawn(async move {
                commerce
                    .transfer_asset(
                        &format!("agent_{i}"),
                        &TenantId::new("t_acme").unwrap(),
                        2_000,
                        "USDC",
                        "0x1",
                        &TraceId::generate(),
                    )
                    .await
            }));
        }

        let outcomes = futures::future::join_all(handles).await;
        let executed = outcomes
            .iter()
            .filter(|o| matches!(o, Ok(Ok(_))))
            .count();
        assert_eq!(executed, 5);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 5);
        assert_eq!(commerce.get_current_spend(&tenant()).await.unwrap(), 10_000);
    }

    #[tokio::test]
    async fn test_tenant_budgets_are_isolated() {
        let backend = Arc::new(CountingBackend::new());
        let commerce = GovernedCommerce::new(backend);
        let other = TenantId::new("t_globex").unwrap();

        commerce
            .transfer_asset("agent_1", &tenant(), 10_000, "USDC", "0x1", &TraceId::generate())
            .await
            .unwrap();

        // The other tenant still has its full budget.
        let record = commerce
            .transfer_asset("agent_1", &other, 10_000, "USDC", "0x1", &TraceId::generate())
            .await
            .unwrap();
        assert_eq!(record.status, TransactionStatus::Executed);
    }
}
