//! Task consumption: dequeue, execute through the LLM port, ack.
//!
//! Ack discipline is the heart of crash recovery: a task is acked only
//! after a result exists for it. An LLM failure leaves the claim in place
//! so the entry is reclaimed after its idle timeout, by this worker or
//! another. Exhausted attempts are terminated as FAILED (and acked) so a
//! poisoned task cannot loop through reclaim forever.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::llm::{LlmError, LlmPort};
use crate::model::{ResultStatus, Task, TaskResult, TenantId};
use crate::queue::{QueueError, TaskQueue};

/// Errors surfaced while processing a batch.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The LLM backend failed; the task was left unacked for reclaim.
    #[error("llm backend failed for task '{task_id}': {source}")]
    Llm {
        task_id: String,
        #[source]
        source: LlmError,
    },
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Service for consuming and processing tasks.
#[derive(Clone)]
pub struct Worker {
    queue: Arc<dyn TaskQueue>,
    llm: Arc<dyn LlmPort>,
    worker_id: String,
    batch_size: usize,
    idle_timeout_ms: u64,
}

impl Worker {
    pub fn new(queue: Arc<dyn TaskQueue>, llm: Arc<dyn LlmPort>, worker_id: impl Into<String>) -> Self {
        Self {
            queue,
            llm,
            worker_id: worker_id.into(),
            batch_size: 1,
            idle_timeout_ms: 10_000,
        }
    }

    /// Worker with batch size and idle timeout taken from configuration.
    pub fn from_config(
        queue: Arc<dyn TaskQueue>,
        llm: Arc<dyn LlmPort>,
        worker_id: impl Into<String>,
        config: &EngineConfig,
    ) -> Self {
        Self::new(queue, llm, worker_id)
            .with_batch_size(config.batch_size)
            .with_idle_timeout(config.idle_timeout_ms)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout_ms: u64) -> Self {
        self.idle_timeout_ms = idle_timeout_ms;
        self
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Consume up to `batch_size` tasks and process them in delivery order.
    pub async fn process_batch(
        &self,
        tenant_id: &TenantId,
        batch_size: usize,
    ) -> Result<Vec<TaskResult>, WorkerError> {
        let tasks = self
            .queue
            .dequeue(tenant_id, batch_size, &self.worker_id)
            .await?;
        self.process_tasks(tenant_id, tasks).await
    }

    /// Reclaim entries another worker failed to ack within `idle_time_ms`
    /// and process them (crash recovery path).
    pub async fn recover_pending(
        &self,
        tenant_id: &TenantId,
        idle_time_ms: u64,
    ) -> Result<Vec<TaskResult>, WorkerError> {
        let tasks = self
            .queue
            .dequeue_pending(tenant_id, &self.worker_id, idle_time_ms)
            .await?;
        if !tasks.is_empty() {
            info!(
                tenant_id = %tenant_id,
                worker_id = %self.worker_id,
                reclaimed = tasks.len(),
                "worker.reclaimed_pending"
            );
        }
        self.process_tasks(tenant_id, tasks).await
    }

    /// One poll cycle: reclaim deliveries idle past the configured timeout,
    /// then pull a fresh batch of the configured size.
    pub async fn run_once(&self, tenant_id: &TenantId) -> Result<Vec<TaskResult>, WorkerError> {
        let mut results = self.recover_pending(tenant_id, self.idle_timeout_ms).await?;
        results.extend(self.process_batch(tenant_id, self.batch_size).await?);
        Ok(results)
    }

    async fn process_tasks(
        &self,
        tenant_id: &TenantId,
        tasks: Vec<Task>,
    ) -> Result<Vec<TaskResult>, WorkerError> {
        let mut results = Vec::with_capacity(tasks.len());

        for mut task in tasks {
            // This delivery is one more attempt, whoever made the earlier ones.
            task.attempt += 1;
            task.mark_started();

            if task.max_attempts > 0 && task.attempt > task.max_attempts {
                warn!(
                    tenant_id = %tenant_id,
                    task_id = %task.task_id,
                    attempt = task.attempt,
                    max_attempts = task.max_attempts,
                    "worker.attempts_exhausted"
                );
                let result = TaskResult::failed(
                    &task,
                    ResultStatus::Failed,
                    serde_json::json!({
                        "kind": "max_attempts_exhausted",
                        "message": format!(
                            "task failed after {} deliveries",
                            task.attempt
                        ),
                    }),
                )
                .with_producer(self.worker_id.clone());
                // Ack so the entry cannot be reclaimed again.
                self.queue.ack(tenant_id, &task, &self.worker_id).await?;
                results.push(result);
                continue;
            }

            match self.llm.generate_result(&task).await {
                Ok(result) => {
                    self.queue.ack(tenant_id, &task, &self.worker_id).await?;
                    info!(
                        tenant_id = %tenant_id,
                        task_id = %task.task_id,
                        status = %result.status,
                        "worker.task_processed"
                    );
                    results.push(result);
                }
                Err(err) => {
                    // No ack: the claim times out and the task is reclaimed.
                    warn!(
                        tenant_id = %tenant_id,
                        task_id = %task.task_id,
                        attempt = task.attempt,
                        error = %err,
                        "worker.llm_failed; leaving task for reclaim"
                    );
                    return Err(WorkerError::Llm {
                        task_id: task.task_id.to_string(),
                        source: err,
                    });
                }
            }
        }

        Ok(results)
    }
}
