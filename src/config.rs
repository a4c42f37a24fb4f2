//! Engine configuration.
//!
//! Plain struct with sane defaults; environment variables override when
//! present (`SWARMGATE_*`). No file I/O happens in the engine itself.

use crate::model::DEFAULT_DAILY_LIMIT_USD_CENTS;
use crate::safety::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_SENSITIVE_KEYWORDS};

/// Tunables for the delivery and governance engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Confidence threshold below which results are flagged for review.
    pub confidence_threshold: f64,
    /// Keywords that flag a result regardless of confidence.
    pub sensitive_keywords: Vec<String>,
    /// Default idle window before an unacked delivery may be reclaimed.
    pub idle_timeout_ms: u64,
    /// Default number of tasks a worker pulls per batch.
    pub batch_size: usize,
    /// Window within which a heartbeat counts as live.
    pub heartbeat_freshness_secs: i64,
    /// Default per-tenant daily spend limit.
    pub daily_limit_usd_cents: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            sensitive_keywords: DEFAULT_SENSITIVE_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            idle_timeout_ms: 10_000,
            batch_size: 1,
            heartbeat_freshness_secs: 30,
            daily_limit_usd_cents: DEFAULT_DAILY_LIMIT_USD_CENTS,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by environment variables where set:
    /// `SWARMGATE_CONFIDENCE_THRESHOLD`, `SWARMGATE_IDLE_TIMEOUT_MS`,
    /// `SWARMGATE_BATCH_SIZE`, `SWARMGATE_HEARTBEAT_FRESHNESS_SECS`,
    /// `SWARMGATE_DAILY_LIMIT_USD_CENTS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(value) = parse_env("SWARMGATE_CONFIDENCE_THRESHOLD") {
            config.confidence_threshold = value;
        }
        if let Some(value) = parse_env("SWARMGATE_IDLE_TIMEOUT_MS") {
            config.idle_timeout_ms = value;
        }
        if let Some(value) = parse_env("SWARMGATE_BATCH_SIZE") {
            config.batch_size = value;
        }
        if let Some(value) = parse_env("SWARMGATE_HEARTBEAT_FRESHNESS_SECS") {
            config.heartbeat_freshness_secs = value;
        }
        if let Some(value) = parse_env("SWARMGATE_DAILY_LIMIT_USD_CENTS") {
            config.daily_limit_usd_cents = value;
        }
        config
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|raw| raw.parse().ok())
}
