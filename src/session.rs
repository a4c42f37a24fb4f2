//! Swarm sessions grouping related tasks.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::model::{SessionId, TenantId};

/// Lifecycle state of a swarm session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Created,
    Running,
    Paused,
    Stopped,
}

/// A session of a swarm belonging to a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwarmSession {
    pub session_id: SessionId,
    pub tenant_id: TenantId,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Keyed in-memory session store.
#[derive(Clone, Default)]
pub struct SessionService {
    sessions: Arc<RwLock<HashMap<String, SwarmSession>>>,
}

impl SessionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_session(&self, tenant_id: &TenantId) -> SwarmSession {
        let now = Utc::now();
        let session = SwarmSession {
            session_id: SessionId::generate(),
            tenant_id: tenant_id.clone(),
            state: SessionState::Created,
            created_at: now,
            updated_at: now,
        };
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.session_id.as_str().to_string(), session.clone());
        session
    }

    pub async fn get_session(&self, session_id: &SessionId) -> Option<SwarmSession> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id.as_str()).cloned()
    }

    /// Update a session's state; returns the updated session if it exists.
    pub async fn set_state(
        &self,
        session_id: &SessionId,
        state: SessionState,
    ) -> Option<SwarmSession> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(session_id.as_str())?;
        session.state = state;
        session.updated_at = Utc::now();
        Some(session.clone())
    }
}
