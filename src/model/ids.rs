//! Validated identifier types shared across the engine.
//!
//! Every piece of state in the engine is scoped to exactly one tenant, so
//! `TenantId` enforces its format at construction and at deserialization.
//! The remaining ids only require non-emptiness.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced when an identifier fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("invalid tenant id '{0}': expected t_[a-z0-9_]+")]
    InvalidTenantId(String),
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Tenant isolation boundary id. Format: `t_` followed by `[a-z0-9_]+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Validate and wrap a raw tenant id.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        let valid = match raw.strip_prefix("t_") {
            Some(body) if !body.is_empty() => body
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_'),
            _ => false,
        };
        if valid {
            Ok(Self(raw))
        } else {
            Err(IdError::InvalidTenantId(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TenantId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for TenantId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Correlation id threaded through every service for observability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(IdError::Empty("trace id"));
        }
        Ok(Self(raw))
    }

    /// Generate a fresh random trace id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for TraceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Unique task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(IdError::Empty("task id"));
        }
        Ok(Self(raw))
    }

    /// Generate a fresh random task id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Swarm session identifier grouping related tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(IdError::Empty("session id"));
        }
        Ok(Self(raw))
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_accepts_valid_format() {
        let tenant = TenantId::new("t_acme").unwrap();
        assert_eq!(tenant.as_str(), "t_acme");

        assert!(TenantId::new("t_acme_2").is_ok());
        assert!(TenantId::new("t_0").is_ok());
    }

    #[test]
    fn test_tenant_id_rejects_malformed() {
        assert!(TenantId::new("acme").is_err());
        assert!(TenantId::new("t_").is_err());
        assert!(TenantId::new("t_ACME").is_err());
        assert!(TenantId::new("t_ac me").is_err());
        assert!(TenantId::new("").is_err());
    }

    #[test]
    fn test_tenant_id_deserialization_validates() {
        let ok: Result<TenantId, _> = serde_json::from_str("\"t_acme\"");
        assert!(ok.is_ok());

        let bad: Result<TenantId, _> = serde_json::from_str("\"ACME\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_non_empty_ids() {
        assert!(TraceId::new("").is_err());
        assert!(TaskId::new("").is_err());
        assert!(SessionId::new("").is_err());
        assert!(TaskId::new("tk_1").is_ok());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(TaskId::generate(), TaskId::generate());
        assert_ne!(TraceId::generate(), TraceId::generate());
    }
}
