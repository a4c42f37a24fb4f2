//! Tenant-scoped task queue port with consumer-group semantics.
//!
//! Guarantees:
//! - at-least-once delivery per tenant partition
//! - FIFO order within a tenant partition for first delivery
//! - a delivery is owned by at most one worker until acked or reclaimed
//! - no ordering guarantee between a reclaim and later enqueues
//!
//! Because a reclaim can re-deliver a task that a crashed worker already
//! processed before acking, every downstream consumer must be idempotent
//! keyed on `task_id`. This is a required invariant of the engine, not an
//! implementation detail of any one backend.

mod memory;

pub use memory::InMemoryTaskQueue;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Task, TenantId};

/// Errors surfaced by queue backends.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue backend error: {0}")]
    Backend(String),
}

/// Port for task queue operations. All operations are tenant-scoped.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Append a task to the tenant's ordered stream.
    async fn enqueue(&self, tenant_id: &TenantId, task: Task) -> Result<(), QueueError>;

    /// Atomically claim up to `batch_size` undelivered entries for
    /// `worker_id`, marking them pending-ack.
    async fn dequeue(
        &self,
        tenant_id: &TenantId,
        batch_size: usize,
        worker_id: &str,
    ) -> Result<Vec<Task>, QueueError>;

    /// Acknowledge successful processing. A task counts as fully delivered
    /// only after ack. Acking an entry that is no longer pending is a no-op.
    async fn ack(&self, tenant_id: &TenantId, task: &Task, worker_id: &str)
        -> Result<(), QueueError>;

    /// Reclaim entries delivered to some worker but not acked within
    /// `idle_time_ms`, re-delivering them to `worker_id` (crash recovery).
    async fn dequeue_pending(
        &self,
        tenant_id: &TenantId,
        worker_id: &str,
        idle_time_ms: u64,
    ) -> Result<Vec<Task>, QueueError>;
}
