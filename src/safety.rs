//! Automated safety gating of agent results.
//!
//! Stateless, pure function of its input: a result passes when its
//! confidence meets the threshold and its output contains no sensitive
//! keyword. Either check failing flags the result for review.

use crate::config::EngineConfig;
use crate::model::{ReviewReason, TaskResult};

/// Keywords that always flag a result, matched case-insensitively.
pub const DEFAULT_SENSITIVE_KEYWORDS: &[&str] = &[
    "password",
    "secret key",
    "delete all",
    "override security",
    "PII",
    "SSN",
];

/// Default confidence threshold below which results are flagged.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Scans results for low confidence and sensitive content.
#[derive(Debug, Clone)]
pub struct SafetyService {
    confidence_threshold: f64,
    keywords: Vec<String>,
}

impl Default for SafetyService {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl SafetyService {
    pub fn new(confidence_threshold: f64) -> Self {
        Self {
            confidence_threshold,
            keywords: DEFAULT_SENSITIVE_KEYWORDS
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    /// Build from engine configuration (threshold and keyword list).
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.confidence_threshold).with_keywords(config.sensitive_keywords.clone())
    }

    /// Replace the keyword list.
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
        self
    }

    fn check_confidence(&self, confidence: f64) -> bool {
        confidence >= self.confidence_threshold
    }

    fn check_keywords(&self, content: &str) -> bool {
        let lowered = content.to_lowercase();
        !self.keywords.iter().any(|k| lowered.contains(k))
    }

    /// Check whether a result passes the automated safety filters.
    ///
    /// Returns true if safe, false if it needs review.
    pub fn check_result(&self, result: &TaskResult) -> bool {
        self.flag_reason(result).is_none()
    }

    /// Report why a result is flagged, if it is.
    ///
    /// A keyword match wins over low confidence when both apply. The
    /// confidence check passes when the producer reported no score.
    pub fn flag_reason(&self, result: &TaskResult) -> Option<ReviewReason> {
        self.flag_output(&result.output, result.confidence)
    }

    /// Same checks over a raw output payload.
    pub fn flag_output(
        &self,
        output: &serde_json::Value,
        confidence: Option<f64>,
    ) -> Option<ReviewReason> {
        if !self.check_keywords(&output.to_string()) {
            return Some(ReviewReason::SensitiveKeyword);
        }
        if let Some(score) = confidence {
            if !self.check_confidence(score) {
                return Some(ReviewReason::LowConfidence);
            }
        }
        None
    }
}
