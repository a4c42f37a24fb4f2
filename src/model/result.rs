//! Terminal task outcomes produced by workers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{TaskId, TenantId, TraceId};
use super::task::Task;
use super::ValidationError;

/// Execution outcome status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Succeeded,
    Failed,
    Cancelled,
    Blocked,
    TimedOut,
}

impl ResultStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ResultStatus::Succeeded)
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResultStatus::Succeeded => "succeeded",
            ResultStatus::Failed => "failed",
            ResultStatus::Cancelled => "cancelled",
            ResultStatus::Blocked => "blocked",
            ResultStatus::TimedOut => "timed_out",
        };
        write!(f, "{}", s)
    }
}

/// A terminal outcome for exactly one task.
///
/// Owned by the worker that produced it; the judge consumes it read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskResult {
    pub tenant_id: TenantId,
    pub trace_id: TraceId,
    pub task_id: TaskId,
    pub status: ResultStatus,
    /// Opaque JSON payload.
    pub output: serde_json::Value,
    /// Error details; present exactly when the status is not succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    /// Producer-reported confidence score in [0, 1], consumed by the
    /// safety gate. Absent means the producer made no claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produced_by: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl TaskResult {
    /// Build a succeeded result for the given task.
    pub fn succeeded(task: &Task, output: serde_json::Value) -> Self {
        Self {
            tenant_id: task.tenant_id.clone(),
            trace_id: task.trace_id.clone(),
            task_id: task.task_id.clone(),
            status: ResultStatus::Succeeded,
            output,
            error: None,
            confidence: None,
            produced_by: None,
            completed_at: Utc::now(),
        }
    }

    /// Build a non-success result for the given task.
    pub fn failed(task: &Task, status: ResultStatus, error: serde_json::Value) -> Self {
        debug_assert!(!status.is_success());
        Self {
            tenant_id: task.tenant_id.clone(),
            trace_id: task.trace_id.clone(),
            task_id: task.task_id.clone(),
            status,
            output: serde_json::json!({}),
            error: Some(error),
            confidence: None,
            produced_by: None,
            completed_at: Utc::now(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_producer(mut self, produced_by: impl Into<String>) -> Self {
        self.produced_by = Some(produced_by.into());
        self
    }

    /// Enforce the error-presence rule: succeeded results carry no error,
    /// every other status carries one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.status.is_success(), self.error.is_some()) {
            (true, true) | (false, false) => Err(ValidationError::ErrorPresence(self.status)),
            _ => Ok(()),
        }
    }
}
