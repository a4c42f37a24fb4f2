//! Concrete gate policies.

use super::{GateDecision, JudgePolicy, ResultEnvelope};
use crate::config::EngineConfig;
use crate::model::ReviewReason;
use crate::safety::SafetyService;

/// Actions that are denied outright rather than escalated.
pub const DEFAULT_FORBIDDEN_ACTIONS: &[&str] = &["delete_all_files", "drop_database"];

/// Default decision policy.
///
/// Forbidden actions are denied; results flagged by the safety service are
/// escalated to a human; everything else is approved.
pub struct DefaultJudgePolicy {
    safety: SafetyService,
    forbidden_actions: Vec<String>,
}

impl Default for DefaultJudgePolicy {
    fn default() -> Self {
        Self::new(SafetyService::default())
    }
}

impl DefaultJudgePolicy {
    pub fn new(safety: SafetyService) -> Self {
        Self {
            safety,
            forbidden_actions: DEFAULT_FORBIDDEN_ACTIONS
                .iter()
                .map(|a| a.to_string())
                .collect(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(SafetyService::from_config(config))
    }

    pub fn with_forbidden_actions(mut self, actions: Vec<String>) -> Self {
        self.forbidden_actions = actions;
        self
    }

    fn forbidden_action(&self, envelope: &ResultEnvelope) -> bool {
        envelope
            .output
            .get("action")
            .and_then(|v| v.as_str())
            .map(|action| self.forbidden_actions.iter().any(|f| f == action))
            .unwrap_or(false)
    }
}

impl JudgePolicy for DefaultJudgePolicy {
    fn decide(&self, envelope: &ResultEnvelope) -> (GateDecision, String) {
        if self.forbidden_action(envelope) {
            return (GateDecision::Deny, "forbidden_action".to_string());
        }

        let output = serde_json::Value::Object(envelope.output.clone());
        match self.safety.flag_output(&output, envelope.confidence) {
            Some(ReviewReason::SensitiveKeyword) => {
                (GateDecision::Hitl, "sensitive_keyword".to_string())
            }
            Some(ReviewReason::LowConfidence) => {
                (GateDecision::Hitl, "low_confidence".to_string())
            }
            None => (GateDecision::Approve, "ok".to_string()),
        }
    }
}
