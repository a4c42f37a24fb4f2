//! In-memory consumer-group queue.
//!
//! Each tenant owns one ordered stream of entries with monotonically
//! increasing delivery ids. A single consumer group per stream tracks
//! per-entry delivery state: unclaimed (backlog), pending with owner and
//! delivery timestamp, or acked (removed). Durable backends plug in behind
//! the same [`TaskQueue`] port.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{QueueError, TaskQueue};
use crate::model::{Task, TenantId};

struct PendingEntry {
    task: Task,
    owner: String,
    delivered_at: Instant,
    /// Number of deliveries so far, including the current one.
    delivery_count: u32,
}

#[derive(Default)]
struct TenantStream {
    next_delivery_id: u64,
    backlog: VecDeque<(u64, Task)>,
    pending: BTreeMap<u64, PendingEntry>,
}

/// In-memory implementation of the [`TaskQueue`] port.
#[derive(Clone, Default)]
pub struct InMemoryTaskQueue {
    streams: Arc<RwLock<HashMap<String, TenantStream>>>,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of undelivered entries for a tenant.
    pub async fn backlog_count(&self, tenant_id: &TenantId) -> usize {
        let streams = self.streams.read().await;
        streams
            .get(tenant_id.as_str())
            .map(|s| s.backlog.len())
            .unwrap_or(0)
    }

    /// Number of delivered-but-unacked entries for a tenant.
    pub async fn pending_count(&self, tenant_id: &TenantId) -> usize {
        let streams = self.streams.read().await;
        streams
            .get(tenant_id.as_str())
            .map(|s| s.pending.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, tenant_id: &TenantId, task: Task) -> Result<(), QueueError> {
        let mut streams = self.streams.write().await;
        let stream = streams.entry(tenant_id.as_str().to_string()).or_default();
        let delivery_id = stream.next_delivery_id;
        stream.next_delivery_id += 1;
        debug!(
            tenant_id = %tenant_id,
            task_id = %task.task_id,
            delivery_id,
            "queue.enqueue"
        );
        stream.backlog.push_back((delivery_id, task));
        Ok(())
    }

    async fn dequeue(
        &self,
        tenant_id: &TenantId,
        batch_size: usize,
        worker_id: &str,
    ) -> Result<Vec<Task>, QueueError> {
        let mut streams = self.streams.write().await;
        let stream = match streams.get_mut(tenant_id.as_str()) {
            Some(stream) => stream,
            None => return Ok(Vec::new()),
        };

        let mut claimed = Vec::new();
        for _ in 0..batch_size {
            let (delivery_id, mut task) = match stream.backlog.pop_front() {
                Some(entry) => entry,
                None => break,
            };
            // Deliveries before this one; first delivery leaves it at zero.
            task.attempt = 0;
            stream.pending.insert(
                delivery_id,
                PendingEntry {
                    task: task.clone(),
                    owner: worker_id.to_string(),
                    delivered_at: Instant::now(),
                    delivery_count: 1,
                },
            );
            debug!(
                tenant_id = %tenant_id,
                task_id = %task.task_id,
                delivery_id,
                worker_id,
                "queue.dequeue"
            );
            claimed.push(task);
        }
        Ok(claimed)
    }

    async fn ack(
        &self,
        tenant_id: &TenantId,
        task: &Task,
        worker_id: &str,
    ) -> Result<(), QueueError> {
        let mut streams = self.streams.write().await;
        let stream = match streams.get_mut(tenant_id.as_str()) {
            Some(stream) => stream,
            None => return Ok(()),
        };

        let delivery_id = stream
            .pending
            .iter()
            .find(|(_, entry)| entry.task.task_id == task.task_id)
            .map(|(id, _)| *id);

        match delivery_id {
            Some(id) => {
                stream.pending.remove(&id);
                debug!(
                    tenant_id = %tenant_id,
                    task_id = %task.task_id,
                    delivery_id = id,
                    worker_id,
                    "queue.ack"
                );
            }
            None => {
                // At-least-once: the entry may already have been acked by a
                // reclaiming worker. Acking twice is not an error.
                debug!(
                    tenant_id = %tenant_id,
                    task_id = %task.task_id,
                    worker_id,
                    "queue.ack: no pending entry"
                );
            }
        }
        Ok(())
    }

    async fn dequeue_pending(
        &self,
        tenant_id: &TenantId,
        worker_id: &str,
        idle_time_ms: u64,
    ) -> Result<Vec<Task>, QueueError> {
        let mut streams = self.streams.write().await;
        let stream = match streams.get_mut(tenant_id.as_str()) {
            Some(stream) => stream,
            None => return Ok(Vec::new()),
        };

        let now = Instant::now();
        let idle = Duration::from_millis(idle_time_ms);
        let mut reclaimed = Vec::new();

        for (delivery_id, entry) in stream.pending.iter_mut() {
            if now.saturating_duration_since(entry.delivered_at) < idle {
                continue;
            }
            entry.owner = worker_id.to_string();
            entry.delivered_at = now;
            entry.delivery_count += 1;
            entry.task.attempt = entry.delivery_count - 1;
            debug!(
                tenant_id = %tenant_id,
                task_id = %entry.task.task_id,
                delivery_id,
                worker_id,
                delivery_count = entry.delivery_count,
                "queue.reclaim"
            );
            reclaimed.push(entry.task.clone());
        }
        Ok(reclaimed)
    }
}
