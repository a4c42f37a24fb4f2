//! Append-only audit trail.
//!
//! Every event is emitted as a structured tracing event at record time and
//! kept in memory; a durable sink can subscribe to the same events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::model::{TenantId, TraceId};

/// A recorded audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditEvent {
    pub tenant_id: TenantId,
    pub trace_id: TraceId,
    pub event_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Minimal audit trail service holding events in memory.
#[derive(Clone, Default)]
pub struct AuditService {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl AuditService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event and emit it as a structured log line.
    pub async fn log_event(
        &self,
        tenant_id: &TenantId,
        trace_id: &TraceId,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> AuditEvent {
        let event = AuditEvent {
            tenant_id: tenant_id.clone(),
            trace_id: trace_id.clone(),
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            payload,
            created_at: Utc::now(),
        };
        info!(
            tenant_id = %event.tenant_id,
            trace_id = %event.trace_id,
            event_id = %event.event_id,
            event_type = %event.event_type,
            "audit.event"
        );
        let mut events = self.events.write().await;
        events.push(event.clone());
        event
    }

    /// Events recorded for a tenant, oldest first.
    pub async fn events_for(&self, tenant_id: &TenantId) -> Vec<AuditEvent> {
        let events = self.events.read().await;
        events
            .iter()
            .filter(|event| event.tenant_id == *tenant_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_are_recorded_per_tenant() {
        let audit = AuditService::new();
        let acme = TenantId::new("t_acme").unwrap();
        let globex = TenantId::new("t_globex").unwrap();

        audit
            .log_event(&acme, &TraceId::generate(), "task.created", serde_json::json!({"k": 1}))
            .await;
        audit
            .log_event(&globex, &TraceId::generate(), "task.created", serde_json::json!({}))
            .await;

        let events = audit.events_for(&acme).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "task.created");
        assert_eq!(events[0].payload, serde_json::json!({"k": 1}));
    }
}
