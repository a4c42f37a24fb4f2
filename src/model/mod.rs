//! Core data model: tasks, results, reviews, heartbeats, and ledger entries.
//!
//! All types are serde-enabled; strict models reject unknown fields so
//! untrusted payloads fail loudly at the boundary.

mod agent;
mod commerce;
mod ids;
mod result;
mod review;
mod task;

pub use agent::{AgentHeartbeat, AgentStatus};
pub use commerce::{
    BudgetConfig, TransactionRecord, TransactionStatus, DEFAULT_DAILY_LIMIT_USD_CENTS,
};
pub use ids::{IdError, SessionId, TaskId, TenantId, TraceId};
pub use result::{ResultStatus, TaskResult};
pub use review::{ReviewCard, ReviewReason, ReviewStatus};
pub use task::{Task, TaskStatus};

use thiserror::Error;

/// Structural validation failures for model types.
///
/// These are rejected before a value enters the pipeline and are never
/// retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("terminal status '{0}' requires completed_at")]
    MissingCompletedAt(TaskStatus),
    #[error("started_at is later than completed_at")]
    TimestampOrder,
    #[error("priority {0} exceeds 100")]
    PriorityRange(u8),
    #[error("error payload must be present exactly when status '{0}' is not succeeded")]
    ErrorPresence(ResultStatus),
    #[error("task kind '{0}' is malformed")]
    BadKind(String),
    #[error(transparent)]
    Id(#[from] IdError),
}
