//! MCP (Model Context Protocol) tool-call port.
//!
//! The process lifecycle, handshake, and stdio framing of a real MCP server
//! live behind [`McpConnector`]; the engine only depends on the
//! capability surface. Acquisition is scoped: [`with_mcp_client`] connects,
//! runs the body, and releases the client on every non-panic exit path.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors surfaced by MCP clients.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("mcp client is not connected")]
    NotConnected,
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("mcp transport error: {0}")]
    Transport(String),
}

/// A tool advertised by an MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool inputs.
    pub input_schema: serde_json::Value,
}

/// Outcome of a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Output content from the tool; dynamic by nature, validated
    /// downstream.
    pub content: serde_json::Value,
    #[serde(default)]
    pub is_error: bool,
}

/// Port for a connected MCP client.
#[async_trait]
pub trait McpClient: Send + Sync {
    /// List all tools available on the connected server.
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, McpError>;

    /// Invoke a tool by name.
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, McpError>;
}

/// Factory that owns the connect/terminate lifecycle of an MCP client.
#[async_trait]
pub trait McpConnector: Send + Sync {
    type Client: McpClient + 'static;

    /// Establish the connection (spawn the server process, handshake).
    async fn connect(&self) -> Result<Self::Client, McpError>;

    /// Tear the connection down (terminate the server process).
    async fn release(&self, client: &Self::Client) -> Result<(), McpError>;
}

/// Run `body` with a freshly connected client, releasing it afterwards on
/// both the success and the error path.
///
/// A release failure after a successful body is surfaced; a release failure
/// after a failed body is logged and the body's error wins.
pub async fn with_mcp_client<C, F, Fut, T>(connector: &C, body: F) -> Result<T, McpError>
where
    C: McpConnector,
    F: FnOnce(Arc<C::Client>) -> Fut,
    Fut: Future<Output = Result<T, McpError>>,
{
    let client = Arc::new(connector.connect().await?);
    let outcome = body(Arc::clone(&client)).await;
    let released = connector.release(&client).await;

    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_err)) => Err(release_err),
        (Err(body_err), released) => {
            if let Err(release_err) = released {
                warn!(error = %release_err, "mcp release failed after body error");
            }
            Err(body_err)
        }
    }
}
