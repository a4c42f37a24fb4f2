//! Sequential workflow execution over registered skills.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::{SkillContext, SkillRegistry, SkillRunRecord, SkillRunStatus};

/// A single step within a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowStep {
    pub skill_name: String,
    /// Raw input payload for the skill; validated by the skill itself.
    #[serde(default)]
    pub input: serde_json::Value,
}

impl WorkflowStep {
    pub fn new(skill_name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            skill_name: skill_name.into(),
            input,
        }
    }
}

/// Definition of a multi-step workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowDefinition {
    pub workflow_id: String,
    pub steps: Vec<WorkflowStep>,
}

/// Captured step records for a workflow execution. Append-only; ends at the
/// first failed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowRunResult {
    pub workflow_id: String,
    pub steps: Vec<SkillRunRecord>,
}

impl WorkflowRunResult {
    /// True when every recorded step succeeded.
    pub fn is_success(&self) -> bool {
        self.steps
            .iter()
            .all(|step| step.status == SkillRunStatus::Succeeded)
    }
}

/// Executes workflow definitions strictly in step order, short-circuiting
/// on the first failure.
pub struct SkillWorkflowRunner {
    registry: Arc<SkillRegistry>,
}

impl SkillWorkflowRunner {
    pub fn new(registry: Arc<SkillRegistry>) -> Self {
        Self { registry }
    }

    /// Run the workflow sequentially.
    ///
    /// Each step resolves its skill, which validates the raw input and
    /// executes with the shared read-only context. A missing skill, an
    /// input-validation failure, or an execution error is recorded as a
    /// FAILED step and ends the run; later steps are not attempted.
    pub async fn run(
        &self,
        definition: &WorkflowDefinition,
        context: &SkillContext,
    ) -> WorkflowRunResult {
        let mut steps = Vec::with_capacity(definition.steps.len());

        for step in &definition.steps {
            let record = match self.registry.get(&step.skill_name) {
                Ok(skill) => match skill.run(step.input.clone(), context).await {
                    Ok(output) => SkillRunRecord::succeeded(&step.skill_name, output),
                    Err(err) => SkillRunRecord::failed(&step.skill_name, err.to_string()),
                },
                Err(err) => SkillRunRecord::failed(&step.skill_name, err.to_string()),
            };

            let failed = record.status == SkillRunStatus::Failed;
            if failed {
                warn!(
                    workflow_id = %definition.workflow_id,
                    skill = %step.skill_name,
                    error = record.error.as_deref().unwrap_or(""),
                    "workflow.step_failed"
                );
            }
            steps.push(record);
            if failed {
                break;
            }
        }

        info!(
            workflow_id = %definition.workflow_id,
            tenant_id = %context.tenant_id,
            steps = steps.len(),
            "workflow.finished"
        );
        WorkflowRunResult {
            workflow_id: definition.workflow_id.clone(),
            steps,
        }
    }
}
