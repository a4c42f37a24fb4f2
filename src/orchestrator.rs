//! Top-level coordination: Planner -> Worker -> Judge, plus the review
//! feedback loop and agent liveness tracking.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::audit::AuditService;
use crate::judge::{GateDecision, JudgeError, JudgeService};
use crate::model::{
    AgentHeartbeat, ReviewCard, ReviewReason, ReviewStatus, Task, TaskId, TaskResult, TaskStatus,
    TenantId,
};
use crate::planner::{Planner, PlannerError};
use crate::registry::{AgentRegistry, InMemoryAgentRegistry};
use crate::review::{ReviewError, ReviewService};
use crate::worker::{Worker, WorkerError};

/// Keyed store tracking task lifecycle state, scoped per tenant.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn upsert(&self, task: Task);
    async fn get(&self, tenant_id: &TenantId, task_id: &TaskId) -> Option<Task>;
}

/// In-memory task store.
#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<String, HashMap<String, Task>>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn upsert(&self, task: Task) {
        let mut tasks = self.tasks.write().await;
        tasks
            .entry(task.tenant_id.as_str().to_string())
            .or_default()
            .insert(task.task_id.as_str().to_string(), task);
    }

    async fn get(&self, tenant_id: &TenantId, task_id: &TaskId) -> Option<Task> {
        let tasks = self.tasks.read().await;
        tasks
            .get(tenant_id.as_str())
            .and_then(|tenant_tasks| tenant_tasks.get(task_id.as_str()))
            .cloned()
    }
}

/// Outcome of a single end-to-end task invocation.
///
/// Policy rejections and escalations are first-class outcomes, never
/// silently converted into successes or generic failures.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// The gate approved; the task reached terminal success.
    Completed(TaskResult),
    /// The gate denied; the task terminated as blocked.
    Rejected { result: TaskResult, reason: String },
    /// The gate escalated; the task is parked until an operator decides.
    /// Not an error: a valid non-terminal outcome.
    NeedsReview {
        result: TaskResult,
        review: ReviewCard,
    },
}

impl TaskOutcome {
    pub fn result(&self) -> &TaskResult {
        match self {
            Self::Completed(result) => result,
            Self::Rejected { result, .. } => result,
            Self::NeedsReview { result, .. } => result,
        }
    }
}

/// Errors surfaced by the orchestration loop.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Planner(#[from] PlannerError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Judge(#[from] JudgeError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error("worker returned no result for task '{0}'")]
    MissingResult(String),
    #[error("no task recorded for review '{0}'")]
    UnknownReviewTask(Uuid),
}

/// Orchestrates the flow between Planner, Worker, Judge, and Review for a
/// tenant. The top-level entry point for the swarm.
pub struct Orchestrator {
    planner: Planner,
    worker: Worker,
    judge: Option<Arc<JudgeService>>,
    reviews: ReviewService,
    tasks: Arc<dyn TaskStore>,
    registry: Arc<dyn AgentRegistry>,
    audit: AuditService,
}

impl Orchestrator {
    pub fn new(planner: Planner, worker: Worker) -> Self {
        Self {
            planner,
            worker,
            judge: None,
            reviews: ReviewService::in_memory(),
            tasks: Arc::new(InMemoryTaskStore::new()),
            registry: Arc::new(InMemoryAgentRegistry::default()),
            audit: AuditService::new(),
        }
    }

    pub fn with_judge(mut self, judge: Arc<JudgeService>) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn with_review_service(mut self, reviews: ReviewService) -> Self {
        self.reviews = reviews;
        self
    }

    pub fn with_task_store(mut self, tasks: Arc<dyn TaskStore>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_agent_registry(mut self, registry: Arc<dyn AgentRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn review_service(&self) -> &ReviewService {
        &self.reviews
    }

    pub fn task_store(&self) -> &Arc<dyn TaskStore> {
        &self.tasks
    }

    pub fn audit(&self) -> &AuditService {
        &self.audit
    }

    /// Record agent presence in the registry.
    pub async fn register_agent_heartbeat(&self, heartbeat: AgentHeartbeat) {
        self.registry.register_heartbeat(heartbeat).await;
    }

    /// Agents currently considered live.
    pub async fn active_agents(&self) -> Vec<AgentHeartbeat> {
        self.registry.get_active_agents().await
    }

    /// Execute a task end-to-end: create it, let a worker process it, and
    /// gate the result.
    pub async fn run_task(
        &self,
        tenant_id: &TenantId,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<TaskOutcome, OrchestratorError> {
        let task = self.planner.create_task(tenant_id, kind, payload).await?;
        self.tasks.upsert(task.clone()).await;

        let results = self.worker.process_batch(tenant_id, 1).await?;
        let result = results
            .into_iter()
            .next()
            .ok_or_else(|| OrchestratorError::MissingResult(task.task_id.to_string()))?;

        // The queue is shared: the delivered task is usually the one just
        // created, but under concurrent planners it may be an earlier one.
        let mut gated_task = match self.tasks.get(tenant_id, &result.task_id).await {
            Some(stored) => stored,
            None => task,
        };
        gated_task.mark_started();

        let decision = match &self.judge {
            Some(judge) => judge.evaluate_result(&gated_task, &result)?,
            None => {
                // No gate configured: results pass through.
                return self.finish_approved(gated_task, result).await;
            }
        };

        match decision.decision {
            GateDecision::Approve => self.finish_approved(gated_task, result).await,
            GateDecision::Deny => {
                gated_task.mark_terminal(TaskStatus::Blocked);
                self.tasks.upsert(gated_task.clone()).await;
                self.audit
                    .log_event(
                        tenant_id,
                        &result.trace_id,
                        "task.blocked",
                        serde_json::json!({
                            "task_id": result.task_id.as_str(),
                            "reason": decision.reason.clone(),
                        }),
                    )
                    .await;
                Ok(TaskOutcome::Rejected {
                    result,
                    reason: decision.reason,
                })
            }
            GateDecision::Hitl => {
                let reason = if decision.reason == "low_confidence" {
                    ReviewReason::LowConfidence
                } else {
                    ReviewReason::SensitiveKeyword
                };
                let card = ReviewCard::new(
                    result.task_id.clone(),
                    result.task_id.as_str(),
                    reason,
                    decision.reason.clone(),
                );
                self.reviews.create_review(tenant_id, card.clone()).await?;

                gated_task.mark_needs_review();
                self.tasks.upsert(gated_task.clone()).await;
                self.audit
                    .log_event(
                        tenant_id,
                        &result.trace_id,
                        "task.needs_review",
                        serde_json::json!({
                            "task_id": result.task_id.as_str(),
                            "review_id": card.review_id.to_string(),
                            "reason": decision.reason,
                        }),
                    )
                    .await;
                Ok(TaskOutcome::NeedsReview {
                    result,
                    review: card,
                })
            }
        }
    }

    async fn finish_approved(
        &self,
        mut task: Task,
        result: TaskResult,
    ) -> Result<TaskOutcome, OrchestratorError> {
        task.mark_terminal(TaskStatus::Succeeded);
        self.tasks.upsert(task).await;
        self.audit
            .log_event(
                &result.tenant_id,
                &result.trace_id,
                "task.completed",
                serde_json::json!({"task_id": result.task_id.as_str()}),
            )
            .await;
        Ok(TaskOutcome::Completed(result))
    }

    /// Apply an operator decision to a pending review and feed it back into
    /// the originating task: approval resumes the task (NEEDS_REVIEW ->
    /// APPROVED), rejection terminates it as BLOCKED.
    pub async fn resolve_review(
        &self,
        tenant_id: &TenantId,
        review_id: Uuid,
        decision: ReviewStatus,
        operator_id: &str,
    ) -> Result<Task, OrchestratorError> {
        let card = self
            .reviews
            .submit_decision(tenant_id, review_id, decision, operator_id)
            .await?;

        let mut task = self
            .tasks
            .get(tenant_id, &card.task_id)
            .await
            .ok_or(OrchestratorError::UnknownReviewTask(review_id))?;

        match card.status {
            ReviewStatus::Approved => task.mark_terminal(TaskStatus::Approved),
            ReviewStatus::Rejected => task.mark_terminal(TaskStatus::Blocked),
            ReviewStatus::Pending => unreachable!("submit_decision rejects pending"),
        }
        self.tasks.upsert(task.clone()).await;

        info!(
            tenant_id = %tenant_id,
            review_id = %review_id,
            task_id = %task.task_id,
            status = %task.status,
            operator_id,
            "orchestrator.review_resolved"
        );
        Ok(task)
    }
}
