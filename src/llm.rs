//! LLM backend port.
//!
//! The engine never generates result content itself; workers hand each task
//! to an implementation of [`LlmPort`] and treat any failure as a
//! transient, retryable delivery failure (no ack, recovered by reclaim).

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Task, TaskResult};

/// Errors surfaced by LLM backends.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The backend could not be reached or the connection dropped mid-call.
    #[error("llm transport error: {0}")]
    Transport(String),
    /// The backend answered but rejected the request.
    #[error("llm backend rejected the request: {0}")]
    Rejected(String),
    /// The backend answered with something that could not be decoded into a
    /// result.
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
}

/// Port for LLM backend interactions, used by workers to process tasks.
#[async_trait]
pub trait LlmPort: Send + Sync {
    /// Process a task through the backend and produce a validated result.
    async fn generate_result(&self, task: &Task) -> Result<TaskResult, LlmError>;
}
