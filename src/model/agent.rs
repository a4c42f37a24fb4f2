//! Agent liveness types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution status of an individual agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Busy,
    Idle,
    Offline,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Busy => write!(f, "busy"),
            Self::Idle => write!(f, "idle"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Heartbeat record for an agent. Last-write-wins per `agent_id`; used only
/// for liveness, never persisted beyond the freshness window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentHeartbeat {
    pub agent_id: String,
    pub status: AgentStatus,
    pub last_seen: DateTime<Utc>,
    /// Opaque agent-specific metrics.
    #[serde(default)]
    pub metrics: serde_json::Value,
}

impl AgentHeartbeat {
    pub fn new(agent_id: impl Into<String>, status: AgentStatus) -> Self {
        Self {
            agent_id: agent_id.into(),
            status,
            last_seen: Utc::now(),
            metrics: serde_json::json!({}),
        }
    }

    pub fn with_metrics(mut self, metrics: serde_json::Value) -> Self {
        self.metrics = metrics;
        self
    }
}
