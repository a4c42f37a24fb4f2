//! Budget configuration and the transaction ledger entry.
//!
//! Money is carried as integer USD cents; no floating point enters any
//! budget comparison.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::{TenantId, TraceId};

/// Default daily spend limit: $100.00.
pub const DEFAULT_DAILY_LIMIT_USD_CENTS: i64 = 10_000;

/// Per-tenant spending limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub daily_limit_usd_cents: i64,
    pub currency: String,
    /// When false, enforcement is disabled for this tenant.
    pub is_active: bool,
}

impl BudgetConfig {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            daily_limit_usd_cents: DEFAULT_DAILY_LIMIT_USD_CENTS,
            currency: "USD".to_string(),
            is_active: true,
        }
    }

    pub fn with_daily_limit(mut self, daily_limit_usd_cents: i64) -> Self {
        self.daily_limit_usd_cents = daily_limit_usd_cents;
        self
    }
}

/// Status of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Executed,
    Rejected,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Executed => write!(f, "EXECUTED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Immutable ledger entry for one financial action.
///
/// The ledger is USD-denominated; resolving asset amounts is the commerce
/// backend's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub trace_id: TraceId,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    pub asset_symbol: String,
    pub amount_usd_cents: i64,
    pub network_fee_usd_cents: i64,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl TransactionRecord {
    /// Build an executed entry.
    pub fn executed(
        tenant_id: TenantId,
        trace_id: TraceId,
        agent_id: impl Into<String>,
        tool_name: impl Into<String>,
        asset_symbol: impl Into<String>,
        amount_usd_cents: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            trace_id,
            agent_id: agent_id.into(),
            timestamp: Utc::now(),
            tool_name: tool_name.into(),
            asset_symbol: asset_symbol.into(),
            amount_usd_cents,
            network_fee_usd_cents: 0,
            status: TransactionStatus::Executed,
            rejection_reason: None,
        }
    }

    /// Build a rejected entry that never reached the backend.
    pub fn rejected(
        tenant_id: TenantId,
        trace_id: TraceId,
        agent_id: impl Into<String>,
        tool_name: impl Into<String>,
        asset_symbol: impl Into<String>,
        amount_usd_cents: i64,
        rejection_reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            trace_id,
            agent_id: agent_id.into(),
            timestamp: Utc::now(),
            tool_name: tool_name.into(),
            asset_symbol: asset_symbol.into(),
            amount_usd_cents,
            network_fee_usd_cents: 0,
            status: TransactionStatus::Rejected,
            rejection_reason: Some(rejection_reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_config_defaults() {
        let config = BudgetConfig::new(TenantId::new("t_acme").unwrap());
        assert_eq!(config.daily_limit_usd_cents, 10_000);
        assert_eq!(config.currency, "USD");
        assert!(config.is_active);
    }

    #[test]
    fn test_transaction_status_serialization() {
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Executed).unwrap(),
            "\"EXECUTED\""
        );
    }

    #[test]
    fn test_rejected_record_carries_reason() {
        let record = TransactionRecord::rejected(
            TenantId::new("t_acme").unwrap(),
            TraceId::generate(),
            "agent_1",
            "transfer_asset",
            "USDC",
            5_000,
            "budget_exceeded",
        );
        assert_eq!(record.status, TransactionStatus::Rejected);
        assert_eq!(record.rejection_reason.as_deref(), Some("budget_exceeded"));
    }
}
