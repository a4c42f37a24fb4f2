//! Distributed agent tracking via heartbeats.
//!
//! Heartbeats are ephemeral: last-write-wins per agent id, and liveness is
//! judged against a freshness window rather than persisted state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::EngineConfig;
use crate::model::{AgentHeartbeat, AgentStatus};

/// Port for agent liveness tracking.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Record or update an agent heartbeat.
    async fn register_heartbeat(&self, heartbeat: AgentHeartbeat);

    /// All agents currently considered live.
    async fn get_active_agents(&self) -> Vec<AgentHeartbeat>;
}

/// In-memory heartbeat registry.
#[derive(Clone)]
pub struct InMemoryAgentRegistry {
    agents: Arc<RwLock<HashMap<String, AgentHeartbeat>>>,
    freshness_window: Duration,
}

impl Default for InMemoryAgentRegistry {
    fn default() -> Self {
        Self::new(Duration::seconds(30))
    }
}

impl InMemoryAgentRegistry {
    pub fn new(freshness_window: Duration) -> Self {
        Self {
            agents: Arc::new(RwLock::new(HashMap::new())),
            freshness_window,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(Duration::seconds(config.heartbeat_freshness_secs))
    }
}

#[async_trait]
impl AgentRegistry for InMemoryAgentRegistry {
    async fn register_heartbeat(&self, heartbeat: AgentHeartbeat) {
        debug!(
            agent_id = %heartbeat.agent_id,
            status = %heartbeat.status,
            "registry.heartbeat"
        );
        let mut agents = self.agents.write().await;
        agents.insert(heartbeat.agent_id.clone(), heartbeat);
    }

    async fn get_active_agents(&self) -> Vec<AgentHeartbeat> {
        let cutoff = Utc::now() - self.freshness_window;
        let agents = self.agents.read().await;
        agents
            .values()
            .filter(|hb| hb.status != AgentStatus::Offline && hb.last_seen >= cutoff)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_heartbeat_last_write_wins() {
        let registry = InMemoryAgentRegistry::default();
        registry
            .register_heartbeat(AgentHeartbeat::new("agent-1", AgentStatus::Active))
            .await;
        registry
            .register_heartbeat(AgentHeartbeat::new("agent-1", AgentStatus::Busy))
            .await;

        let active = registry.get_active_agents().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].status, AgentStatus::Busy);
    }

    #[tokio::test]
    async fn test_offline_agents_are_not_active() {
        let registry = InMemoryAgentRegistry::default();
        registry
            .register_heartbeat(AgentHeartbeat::new("agent-1", AgentStatus::Offline))
            .await;
        assert!(registry.get_active_agents().await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_heartbeats_age_out() {
        let registry = InMemoryAgentRegistry::new(Duration::seconds(10));
        let mut heartbeat = AgentHeartbeat::new("agent-1", AgentStatus::Active);
        heartbeat.last_seen = Utc::now() - Duration::seconds(60);
        registry.register_heartbeat(heartbeat).await;

        assert!(registry.get_active_agents().await.is_empty());
    }

    #[tokio::test]
    async fn test_many_concurrent_heartbeats() {
        let registry = Arc::new(InMemoryAgentRegistry::default());

        let sends = (0..1000).map(|i| {
            let registry = Arc::clone(&registry);
            async move {
                registry
                    .register_heartbeat(
                        AgentHeartbeat::new(format!("agent-{i}"), AgentStatus::Active)
                            .with_metrics(serde_json::json!({"load": 0.1})),
                    )
                    .await;
            }
        });
        futures::future::join_all(sends).await;

        assert_eq!(registry.get_active_agents().await.len(), 1000);
    }
}
