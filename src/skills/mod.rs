//! Skill framework: the smallest reusable capability units the planner can
//! invoke, plus the sequential workflow runner that chains them.

mod builtin;
mod registry;
mod workflow;

pub use builtin::{EchoSkill, McpToolSkill, NormalizeHandleSkill};
pub use registry::SkillRegistry;
pub use workflow::{
    SkillWorkflowRunner, WorkflowDefinition, WorkflowRunResult, WorkflowStep,
};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mcp::{McpClient, McpError};
use crate::model::{TenantId, TraceId};

/// Errors surfaced by skill lookup and execution.
#[derive(Debug, Error)]
pub enum SkillError {
    #[error("skill '{0}' is not registered")]
    NotRegistered(String),
    #[error("skill '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("invalid input for skill '{skill}': {message}")]
    InvalidInput { skill: String, message: String },
    #[error("skill '{skill}' failed: {message}")]
    Execution { skill: String, message: String },
    #[error(transparent)]
    Mcp(#[from] McpError),
}

/// Execution context provided to every skill.
///
/// Read-only to skills: it is passed by shared reference and skills must
/// not rely on mutating it.
#[derive(Clone)]
pub struct SkillContext {
    pub tenant_id: TenantId,
    pub trace_id: TraceId,
    /// Optional MCP client handle for tool-bridging skills.
    pub mcp_client: Option<Arc<dyn McpClient>>,
    /// String metadata for additional coordination.
    pub metadata: HashMap<String, String>,
}

impl SkillContext {
    pub fn new(tenant_id: TenantId, trace_id: TraceId) -> Self {
        Self {
            tenant_id,
            trace_id,
            mcp_client: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_mcp_client(mut self, client: Arc<dyn McpClient>) -> Self {
        self.mcp_client = Some(client);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// An executable skill.
///
/// Each skill validates its raw JSON input against its own schema before
/// executing; a validation failure is an [`SkillError::InvalidInput`].
#[async_trait]
pub trait Skill: Send + Sync {
    /// Unique skill name used for registry lookup.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Validate the raw input and execute with the shared context.
    async fn run(
        &self,
        input: serde_json::Value,
        context: &SkillContext,
    ) -> Result<serde_json::Value, SkillError>;
}

/// Deserialize a skill input payload, mapping failures onto
/// [`SkillError::InvalidInput`].
pub(crate) fn parse_input<T: serde::de::DeserializeOwned>(
    skill: &str,
    input: serde_json::Value,
) -> Result<T, SkillError> {
    serde_json::from_value(input).map_err(|err| SkillError::InvalidInput {
        skill: skill.to_string(),
        message: err.to_string(),
    })
}

/// Status of a single skill execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillRunStatus {
    Succeeded,
    Failed,
}

/// Record of a single skill execution within a workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkillRunRecord {
    pub skill_name: String,
    pub status: SkillRunStatus,
    pub output: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl SkillRunRecord {
    pub fn succeeded(skill_name: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            skill_name: skill_name.into(),
            status: SkillRunStatus::Succeeded,
            output,
            error: None,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(skill_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            skill_name: skill_name.into(),
            status: SkillRunStatus::Failed,
            output: serde_json::json!({}),
            error: Some(error.into()),
            completed_at: Utc::now(),
        }
    }
}
