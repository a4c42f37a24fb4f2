//! Judge security gate: validates result payloads, applies policy, and
//! persists the outcome.
//!
//! State machine per judgement: `validate -> policy.decide -> persist`.
//! The persistence step carries a hard ordering invariant: the outcome is
//! recorded on a fresh unit-of-work, the structured outcome event is
//! emitted, and only then is the unit-of-work committed. The event is
//! append-only evidence; a later commit failure rolls the store back and
//! propagates, but never retracts the event.

mod policy;
mod store;

pub use policy::DefaultJudgePolicy;
pub use store::{MemoryJudgeStore, MemoryJudgeUowFactory};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::model::{Task, TaskId, TaskResult, TenantId, TraceId};

/// Gate decision emitted by the judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateDecision {
    Approve,
    Deny,
    Hitl,
}

impl std::fmt::Display for GateDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approve => write!(f, "approve"),
            Self::Deny => write!(f, "deny"),
            Self::Hitl => write!(f, "hitl"),
        }
    }
}

/// Outcome produced by the judge for a given result payload.
/// Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JudgeOutcome {
    pub decision: GateDecision,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl JudgeOutcome {
    fn denied(reason: impl Into<String>) -> Self {
        Self {
            decision: GateDecision::Deny,
            reason: reason.into(),
            tenant_id: None,
            trace_id: None,
            task_id: None,
        }
    }
}

/// Validated result payload: untrusted input normalized into a strict model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultEnvelope {
    pub tenant_id: TenantId,
    pub trace_id: TraceId,
    pub task_id: TaskId,
    pub kind: String,
    pub status: String,
    #[serde(default)]
    pub output: serde_json::Map<String, serde_json::Value>,
    /// Producer-reported confidence, consumed by safety-aware policies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ResultEnvelope {
    fn is_well_formed(&self) -> bool {
        !self.kind.is_empty() && !self.status.is_empty()
    }

    /// Parse an untrusted JSON value. Returns None on any schema violation.
    pub fn from_value(payload: &serde_json::Value) -> Option<Self> {
        serde_json::from_value::<Self>(payload.clone())
            .ok()
            .filter(Self::is_well_formed)
    }

    /// Parse untrusted JSON text. Returns None on any schema violation.
    pub fn from_json(payload: &str) -> Option<Self> {
        serde_json::from_str::<Self>(payload)
            .ok()
            .filter(Self::is_well_formed)
    }

    /// Build an envelope from a trusted in-process task/result pair.
    pub fn from_task_result(task: &Task, result: &TaskResult) -> Self {
        Self {
            tenant_id: result.tenant_id.clone(),
            trace_id: result.trace_id.clone(),
            task_id: result.task_id.clone(),
            kind: task.kind.clone(),
            status: result.status.to_string(),
            output: result.output.as_object().cloned().unwrap_or_default(),
            confidence: result.confidence,
        }
    }
}

/// Policy for deciding whether a validated result passes the gate.
pub trait JudgePolicy: Send + Sync {
    /// Return (decision, reason_code) for a validated result.
    fn decide(&self, envelope: &ResultEnvelope) -> (GateDecision, String);
}

/// Persistence boundary for recording judge outcomes. One unit-of-work per
/// judgement; never shared across concurrent calls.
pub trait JudgeUnitOfWork: Send {
    /// Stage the outcome for persistence.
    fn record_outcome(&mut self, outcome: &JudgeOutcome);

    /// Commit staged changes.
    fn commit(&mut self) -> Result<(), JudgeError>;

    /// Discard staged changes.
    fn rollback(&mut self);
}

/// Factory creating a fresh unit-of-work per judgement.
pub trait JudgeUowFactory: Send + Sync {
    fn begin(&self) -> Box<dyn JudgeUnitOfWork>;
}

/// Sink for judge outcome events.
///
/// Deployments that read logs as their primary signal depend on these
/// events existing independently of storage commits, so the sink is a
/// first-class injection point rather than a side effect of persistence.
pub trait JudgeEventSink: Send + Sync {
    /// An outcome was decided for a valid payload.
    fn outcome(&self, outcome: &JudgeOutcome);

    /// A payload failed validation.
    fn invalid(&self, reason: &str);
}

/// Default sink emitting structured tracing events.
#[derive(Debug, Default, Clone)]
pub struct TracingEventSink;

impl JudgeEventSink for TracingEventSink {
    fn outcome(&self, outcome: &JudgeOutcome) {
        info!(
            decision = %outcome.decision,
            reason = %outcome.reason,
            tenant_id = outcome.tenant_id.as_deref().unwrap_or(""),
            trace_id = outcome.trace_id.as_deref().unwrap_or(""),
            task_id = outcome.task_id.as_deref().unwrap_or(""),
            "judge.outcome"
        );
    }

    fn invalid(&self, reason: &str) {
        warn!(reason, "judge.invalid_result");
    }
}

/// Errors surfaced by the judge.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge outcome commit failed: {0}")]
    Commit(String),
}

/// Service that validates results, enforces gate decisions, and persists
/// outcomes.
pub struct JudgeService {
    policy: Arc<dyn JudgePolicy>,
    uow_factory: Arc<dyn JudgeUowFactory>,
    events: Arc<dyn JudgeEventSink>,
}

impl JudgeService {
    pub fn new(policy: Arc<dyn JudgePolicy>, uow_factory: Arc<dyn JudgeUowFactory>) -> Self {
        Self {
            policy,
            uow_factory,
            events: Arc::new(TracingEventSink),
        }
    }

    /// Judge over a fresh in-memory outcome store; returns the store so
    /// callers can inspect committed outcomes.
    pub fn in_memory(policy: Arc<dyn JudgePolicy>) -> (Self, MemoryJudgeStore) {
        let store = MemoryJudgeStore::new();
        let service = Self::new(policy, Arc::new(MemoryJudgeUowFactory::new(store.clone())));
        (service, store)
    }

    /// Replace the event sink (tests, log shippers).
    pub fn with_event_sink(mut self, events: Arc<dyn JudgeEventSink>) -> Self {
        self.events = events;
        self
    }

    /// Validate and judge an untrusted JSON payload.
    ///
    /// Invalid payloads are denied with reason "invalid_result" and nothing
    /// is persisted; there is nothing trustworthy to persist.
    pub fn judge_value(&self, payload: &serde_json::Value) -> Result<JudgeOutcome, JudgeError> {
        self.judge_envelope(ResultEnvelope::from_value(payload))
    }

    /// Validate and judge untrusted JSON text.
    pub fn judge_json(&self, payload: &str) -> Result<JudgeOutcome, JudgeError> {
        self.judge_envelope(ResultEnvelope::from_json(payload))
    }

    /// Gate an in-process task/result pair, recording the outcome with the
    /// same durability ordering as the payload path.
    pub fn evaluate_result(
        &self,
        task: &Task,
        result: &TaskResult,
    ) -> Result<JudgeOutcome, JudgeError> {
        self.judge_envelope(Some(ResultEnvelope::from_task_result(task, result)))
    }

    fn judge_envelope(&self, envelope: Option<ResultEnvelope>) -> Result<JudgeOutcome, JudgeError> {
        let envelope = match envelope {
            Some(envelope) => envelope,
            None => {
                let outcome = JudgeOutcome::denied("invalid_result");
                self.events.invalid(&outcome.reason);
                return Ok(outcome);
            }
        };

        let (decision, reason) = self.policy.decide(&envelope);
        let outcome = JudgeOutcome {
            decision,
            reason,
            tenant_id: Some(envelope.tenant_id.to_string()),
            trace_id: Some(envelope.trace_id.to_string()),
            task_id: Some(envelope.task_id.to_string()),
        };

        let mut uow = self.uow_factory.begin();
        uow.record_outcome(&outcome);

        // Ordering invariant: emit the outcome event before committing.
        self.events.outcome(&outcome);

        if let Err(err) = uow.commit() {
            uow.rollback();
            return Err(err);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Shared event timeline, mirroring how a recording log handler and a
    /// recording unit-of-work observe ordering.
    #[derive(Clone, Default)]
    struct Timeline(Arc<Mutex<Vec<(&'static str, &'static str)>>>);

    impl Timeline {
        fn push(&self, kind: &'static str, event: &'static str) {
            self.0.lock().unwrap().push((kind, event));
        }

        fn entries(&self) -> Vec<(&'static str, &'static str)> {
            self.0.lock().unwrap().clone()
        }
    }

    struct RecordingSink(Timeline);

    impl JudgeEventSink for RecordingSink {
        fn outcome(&self, _outcome: &JudgeOutcome) {
            self.0.push("log", "judge.outcome");
        }

        fn invalid(&self, _reason: &str) {
            self.0.push("log", "judge.invalid_result");
        }
    }

    struct RecordingUow {
        timeline: Timeline,
        fail_commit: bool,
    }

    impl JudgeUnitOfWork for RecordingUow {
        fn record_outcome(&mut self, _outcome: &JudgeOutcome) {
            self.timeline.push("uow", "record_outcome");
        }

        fn commit(&mut self) -> Result<(), JudgeError> {
            if self.fail_commit {
                return Err(JudgeError::Commit("disk full".to_string()));
            }
            self.timeline.push("uow", "commit");
            Ok(())
        }

        fn rollback(&mut self) {
            self.timeline.push("uow", "rollback");
        }
    }

    struct RecordingFactory {
        timeline: Timeline,
        fail_commit: bool,
    }

    impl JudgeUowFactory for RecordingFactory {
        fn begin(&self) -> Box<dyn JudgeUnitOfWork> {
            Box::new(RecordingUow {
                timeline: self.timeline.clone(),
                fail_commit: self.fail_commit,
            })
        }
    }

    struct AllowAllPolicy;

    impl JudgePolicy for AllowAllPolicy {
        fn decide(&self, _envelope: &ResultEnvelope) -> (GateDecision, String) {
            (GateDecision::Approve, "ok".to_string())
        }
    }

    fn recording_judge(fail_commit: bool) -> (JudgeService, Timeline) {
        let timeline = Timeline::default();
        let judge = JudgeService::new(
            Arc::new(AllowAllPolicy),
            Arc::new(RecordingFactory {
                timeline: timeline.clone(),
                fail_commit,
            }),
        )
        .with_event_sink(Arc::new(RecordingSink(timeline.clone())));
        (judge, timeline)
    }

    #[test]
    fn test_invalid_payload_denied_without_persistence() {
        let (judge, timeline) = recording_judge(false);

        // Missing required fields.
        let outcome = judge
            .judge_value(&serde_json::json!({"tenant_id": "t_acme"}))
            .unwrap();

        assert_eq!(outcome.decision, GateDecision::Deny);
        assert_eq!(outcome.reason, "invalid_result");
        assert_eq!(timeline.entries(), vec![("log", "judge.invalid_result")]);
    }

    #[test]
    fn test_log_emitted_before_commit_for_valid_payload() {
        let (judge, timeline) = recording_judge(false);

        let outcome = judge
            .judge_value(&serde_json::json!({
                "tenant_id": "t_acme",
                "trace_id": "trace-123",
                "task_id": "task-123",
                "kind": "publish",
                "status": "succeeded",
                "output": {"url": "https://example.com"},
            }))
            .unwrap();

        assert_eq!(outcome.decision, GateDecision::Approve);
        assert_eq!(
            timeline.entries(),
            vec![
                ("uow", "record_outcome"),
                ("log", "judge.outcome"),
                ("uow", "commit"),
            ]
        );
    }

    #[test]
    fn test_commit_failure_rolls_back_and_propagates() {
        let (judge, timeline) = recording_judge(true);

        let outcome = judge.judge_json(
            r#"{"tenant_id": "t_acme", "trace_id": "tr", "task_id": "tk", "kind": "k", "status": "succeeded"}"#,
        );

        assert!(matches!(outcome, Err(JudgeError::Commit(_))));
        // The outcome event is not retracted by the failed commit.
        assert_eq!(
            timeline.entries(),
            vec![
                ("uow", "record_outcome"),
                ("log", "judge.outcome"),
                ("uow", "rollback"),
            ]
        );
    }

    #[test]
    fn test_envelope_rejects_unknown_fields_and_bad_tenant() {
        assert!(ResultEnvelope::from_value(&serde_json::json!({
            "tenant_id": "t_acme",
            "trace_id": "tr",
            "task_id": "tk",
            "kind": "k",
            "status": "succeeded",
            "surprise": true,
        }))
        .is_none());

        assert!(ResultEnvelope::from_value(&serde_json::json!({
            "tenant_id": "ACME",
            "trace_id": "tr",
            "task_id": "tk",
            "kind": "k",
            "status": "succeeded",
        }))
        .is_none());

        // Empty kind/status are malformed even though they deserialize.
        assert!(ResultEnvelope::from_value(&serde_json::json!({
            "tenant_id": "t_acme",
            "trace_id": "tr",
            "task_id": "tk",
            "kind": "",
            "status": "succeeded",
        }))
        .is_none());
    }

    #[test]
    fn test_judge_json_accepts_text_payloads() {
        let (judge, _) = recording_judge(false);
        let outcome = judge
            .judge_json(
                r#"{"tenant_id": "t_acme", "trace_id": "tr", "task_id": "tk", "kind": "k", "status": "succeeded", "output": {}}"#,
            )
            .unwrap();
        assert_eq!(outcome.decision, GateDecision::Approve);
        assert_eq!(outcome.tenant_id.as_deref(), Some("t_acme"));
    }

    #[test]
    fn test_malformed_json_text_is_denied() {
        let (judge, _) = recording_judge(false);
        let outcome = judge.judge_json("not json at all").unwrap();
        assert_eq!(outcome.decision, GateDecision::Deny);
        assert_eq!(outcome.reason, "invalid_result");
    }
}
