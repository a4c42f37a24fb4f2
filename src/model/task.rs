//! Task definition and lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{SessionId, TaskId, TenantId, TraceId};
use super::ValidationError;

/// Lifecycle stages of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Blocked,
    TimedOut,
    NeedsReview,
    Approved,
}

impl TaskStatus {
    /// Check if this is a terminal status (no further transitions).
    ///
    /// `NeedsReview` is explicitly non-terminal: the task is parked until a
    /// human decision feeds back through the review lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded
                | TaskStatus::Failed
                | TaskStatus::Cancelled
                | TaskStatus::Blocked
                | TaskStatus::TimedOut
                | TaskStatus::Approved
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Blocked => "blocked",
            TaskStatus::TimedOut => "timed_out",
            TaskStatus::NeedsReview => "needs_review",
            TaskStatus::Approved => "approved",
        };
        write!(f, "{}", s)
    }
}

/// A unit of requested work created by a Planner and processed by a Worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    /// Strict isolation boundary.
    pub tenant_id: TenantId,
    /// Correlation id across services.
    pub trace_id: TraceId,
    pub task_id: TaskId,
    /// Parent task for decomposed work.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Stable task type tag (e.g. "skill.invoke").
    pub kind: String,
    /// Opaque JSON payload.
    pub input: serde_json::Value,
    pub status: TaskStatus,
    /// Execution priority, 0-100.
    #[serde(default)]
    pub priority: u8,
    /// Deliveries processed so far; advisory metadata, bumped by workers.
    #[serde(default)]
    pub attempt: u32,
    /// Zero disables the attempt bound.
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_s: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new queued task with generated task and trace ids.
    pub fn new(tenant_id: TenantId, kind: impl Into<String>, input: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            tenant_id,
            trace_id: TraceId::generate(),
            task_id: TaskId::generate(),
            parent_task_id: None,
            session_id: None,
            kind: kind.into(),
            input,
            status: TaskStatus::Queued,
            priority: 0,
            attempt: 0,
            max_attempts: 0,
            timeout_s: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Verify the structural invariants of the task.
    ///
    /// Terminal statuses require `completed_at`; timestamps must be ordered;
    /// priority stays within 0-100.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.status.is_terminal() && self.completed_at.is_none() {
            return Err(ValidationError::MissingCompletedAt(self.status));
        }
        if let (Some(started), Some(completed)) = (self.started_at, self.completed_at) {
            if started > completed {
                return Err(ValidationError::TimestampOrder);
            }
        }
        if self.priority > 100 {
            return Err(ValidationError::PriorityRange(self.priority));
        }
        Ok(())
    }

    /// Mark the task as picked up by a worker.
    pub fn mark_started(&mut self) {
        let now = Utc::now();
        self.status = TaskStatus::Running;
        self.started_at.get_or_insert(now);
        self.updated_at = now;
    }

    /// Transition into a terminal status, stamping `completed_at`.
    pub fn mark_terminal(&mut self, status: TaskStatus) {
        debug_assert!(status.is_terminal());
        let now = Utc::now();
        self.status = status;
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Park the task for human review. Deliberately leaves `completed_at`
    /// unset: the task is not terminal until the review resolves.
    pub fn mark_needs_review(&mut self) {
        self.status = TaskStatus::NeedsReview;
        self.updated_at = Utc::now();
    }
}
