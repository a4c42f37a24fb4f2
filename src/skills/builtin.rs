//! Built-in skills.

use async_trait::async_trait;
use serde::Deserialize;

use super::{parse_input, Skill, SkillContext, SkillError};

/// Deterministic, side-effect free skill used as a runtime smoke test.
pub struct EchoSkill;

#[derive(Debug, Deserialize)]
struct EchoInput {
    message: String,
}

#[async_trait]
impl Skill for EchoSkill {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Echo back a provided message."
    }

    async fn run(
        &self,
        input: serde_json::Value,
        _context: &SkillContext,
    ) -> Result<serde_json::Value, SkillError> {
        let payload: EchoInput = parse_input(self.name(), input)?;
        Ok(serde_json::json!({ "message": payload.message }))
    }
}

/// Canonicalizes social handles into an `@handle` string.
pub struct NormalizeHandleSkill;

#[derive(Debug, Deserialize)]
struct NormalizeHandleInput {
    handle: String,
}

#[async_trait]
impl Skill for NormalizeHandleSkill {
    fn name(&self) -> &'static str {
        "normalize_handle"
    }

    fn description(&self) -> &'static str {
        "Normalize a social handle into a canonical format."
    }

    async fn run(
        &self,
        input: serde_json::Value,
        _context: &SkillContext,
    ) -> Result<serde_json::Value, SkillError> {
        let payload: NormalizeHandleInput = parse_input(self.name(), input)?;
        let trimmed = payload.handle.trim();
        let normalized = if trimmed.starts_with('@') {
            trimmed.to_string()
        } else {
            format!("@{trimmed}")
        };
        Ok(serde_json::json!({ "handle": normalized }))
    }
}

/// Bridges a skill invocation to an MCP tool call through the client on the
/// context.
pub struct McpToolSkill;

#[derive(Debug, Deserialize)]
struct McpToolInput {
    tool_name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[async_trait]
impl Skill for McpToolSkill {
    fn name(&self) -> &'static str {
        "mcp_tool"
    }

    fn description(&self) -> &'static str {
        "Invoke an MCP tool using the active MCP client."
    }

    async fn run(
        &self,
        input: serde_json::Value,
        context: &SkillContext,
    ) -> Result<serde_json::Value, SkillError> {
        let payload: McpToolInput = parse_input(self.name(), input)?;
        let client = context.mcp_client.as_ref().ok_or(SkillError::Execution {
            skill: "mcp_tool".to_string(),
            message: "an MCP client is required".to_string(),
        })?;

        let result = client
            .call_tool(&payload.tool_name, payload.arguments)
            .await?;
        Ok(serde_json::json!({
            "response": {
                "content": result.content,
                "is_error": result.is_error,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::{McpClient, McpError, ToolDefinition, ToolResult};
    use crate::model::{TenantId, TraceId};
    use std::sync::Arc;

    fn context() -> SkillContext {
        SkillContext::new(TenantId::new("t_acme").unwrap(), TraceId::generate())
    }

    #[tokio::test]
    async fn test_echo_returns_message_unchanged() {
        let output = EchoSkill
            .run(serde_json::json!({"message": "hi"}), &context())
            .await
            .unwrap();
        assert_eq!(output, serde_json::json!({"message": "hi"}));
    }

    #[tokio::test]
    async fn test_echo_rejects_missing_message() {
        let outcome = EchoSkill.run(serde_json::json!({}), &context()).await;
        assert!(matches!(outcome, Err(SkillError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_normalize_handle_prefixes_at() {
        let output = NormalizeHandleSkill
            .run(serde_json::json!({"handle": "  swarm_dev "}), &context())
            .await
            .unwrap();
        assert_eq!(output, serde_json::json!({"handle": "@swarm_dev"}));

        let output = NormalizeHandleSkill
            .run(serde_json::json!({"handle": "@already"}), &context())
            .await
            .unwrap();
        assert_eq!(output, serde_json::json!({"handle": "@already"}));
    }

    struct StubMcp;

    #[async_trait]
    impl McpClient for StubMcp {
        async fn list_tools(&self) -> Result<Vec<ToolDefinition>, McpError> {
            Ok(Vec::new())
        }

        async fn call_tool(
            &self,
            name: &str,
            arguments: serde_json::Value,
        ) -> Result<ToolResult, McpError> {
            Ok(ToolResult {
                content: serde_json::json!({"tool": name, "args": arguments}),
                is_error: false,
            })
        }
    }

    #[tokio::test]
    async fn test_mcp_tool_requires_client() {
        let outcome = McpToolSkill
            .run(serde_json::json!({"tool_name": "search"}), &context())
            .await;
        assert!(matches!(outcome, Err(SkillError::Execution { .. })));
    }

    #[tokio::test]
    async fn test_mcp_tool_bridges_call() {
        let ctx = context().with_mcp_client(Arc::new(StubMcp));
        let output = McpToolSkill
            .run(
                serde_json::json!({"tool_name": "search", "arguments": {"q": "rust"}}),
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(
            output["response"]["content"],
            serde_json::json!({"tool": "search", "args": {"q": "rust"}})
        );
        assert_eq!(output["response"]["is_error"], serde_json::json!(false));
    }
}
