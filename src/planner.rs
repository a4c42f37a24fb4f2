//! Task creation: the entry point for work into the swarm.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::model::{Task, TenantId, ValidationError};
use crate::queue::{QueueError, TaskQueue};

/// Errors surfaced by task creation.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Service for creating and enqueuing tasks.
#[derive(Clone)]
pub struct Planner {
    queue: Arc<dyn TaskQueue>,
}

impl Planner {
    pub fn new(queue: Arc<dyn TaskQueue>) -> Self {
        Self { queue }
    }

    /// Create a validated task and push it onto the tenant's stream.
    ///
    /// Creation is a single local operation: validation failures never
    /// enqueue, and there are no retries here.
    pub async fn create_task(
        &self,
        tenant_id: &TenantId,
        kind: &str,
        input: serde_json::Value,
    ) -> Result<Task, PlannerError> {
        if !valid_kind(kind) {
            return Err(ValidationError::BadKind(kind.to_string()).into());
        }

        let task = Task::new(tenant_id.clone(), kind, input);
        task.validate()?;
        self.queue.enqueue(tenant_id, task.clone()).await?;
        info!(
            tenant_id = %tenant_id,
            task_id = %task.task_id,
            kind,
            "planner.task_created"
        );
        Ok(task)
    }
}

/// A kind is a stable dotted type tag: non-empty segments of
/// `[a-z0-9_]` separated by dots (e.g. "skill.invoke", "test.job").
fn valid_kind(kind: &str) -> bool {
    !kind.is_empty()
        && kind.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InMemoryTaskQueue;

    fn tenant() -> TenantId {
        TenantId::new("t_acme").unwrap()
    }

    #[tokio::test]
    async fn test_create_task_enqueues() {
        let queue = Arc::new(InMemoryTaskQueue::new());
        let planner = Planner::new(queue.clone());

        let input = serde_json::json!({"action": "greet", "name": "world"});
        let task = planner
            .create_task(&tenant(), "skill.invoke", input.clone())
            .await
            .unwrap();

        assert_eq!(task.tenant_id.as_str(), "t_acme");
        assert_eq!(task.kind, "skill.invoke");
        assert_eq!(task.input, input);
        assert_eq!(task.attempt, 0);

        // The exact task landed on the queue.
        let queued = queue.dequeue(&tenant(), 1, "w1").await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].task_id, task.task_id);
    }

    #[tokio::test]
    async fn test_malformed_kind_is_rejected_without_enqueue() {
        let queue = Arc::new(InMemoryTaskQueue::new());
        let planner = Planner::new(queue.clone());

        for kind in ["", "Skill.Invoke", "has space", "double..dot", "trailing."] {
            let outcome = planner
                .create_task(&tenant(), kind, serde_json::json!({}))
                .await;
            assert!(
                matches!(
                    outcome,
                    Err(PlannerError::Validation(ValidationError::BadKind(_)))
                ),
                "kind '{kind}' should be rejected"
            );
        }
        assert_eq!(queue.backlog_count(&tenant()).await, 0);
    }

    #[test]
    fn test_valid_kind_accepts_dotted_tags() {
        assert!(valid_kind("test.job"));
        assert!(valid_kind("skill.invoke"));
        assert!(valid_kind("echo"));
        assert!(valid_kind("a_b.c_1"));
    }
}
