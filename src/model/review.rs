//! Human-in-the-loop review cards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::TaskId;

/// Why a result was flagged for review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReason {
    LowConfidence,
    SensitiveKeyword,
}

impl std::fmt::Display for ReviewReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowConfidence => write!(f, "low_confidence"),
            Self::SensitiveKeyword => write!(f, "sensitive_keyword"),
        }
    }
}

/// Status of a review card. Pending cards resolve exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Information for human intervention on a flagged result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewCard {
    pub review_id: Uuid,
    pub task_id: TaskId,
    /// Identifier of the flagged result (task-scoped, one result per task).
    pub result_id: String,
    pub reason: ReviewReason,
    pub details: String,
    pub status: ReviewStatus,
    /// Set exactly once, at resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_at: Option<DateTime<Utc>>,
}

impl ReviewCard {
    /// Create a new pending card.
    pub fn new(
        task_id: TaskId,
        result_id: impl Into<String>,
        reason: ReviewReason,
        details: impl Into<String>,
    ) -> Self {
        Self {
            review_id: Uuid::new_v4(),
            task_id,
            result_id: result_id.into(),
            reason,
            details: details.into(),
            status: ReviewStatus::Pending,
            operator_id: None,
            timestamp: Utc::now(),
            resolution_at: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self.status, ReviewStatus::Pending)
    }
}
