use async_trait::async_trait;
use serde_json::Value;

use crate::tool::{ToolDefinition, ToolError};

/// A named-tool remote procedure surface.
///
/// Implemented in-process by [`ToolRegistry`](crate::ToolRegistry) and over
/// HTTP by the MCP gateway client, so the conversation loop and the gateway
/// never care where a tool actually runs.
#[async_trait]
pub trait ToolService: Send + Sync {
    /// Definitions of every tool this service can dispatch to.
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError>;

    /// Execute `name` with `arguments`. Unknown names fail with
    /// [`ToolError::UnknownTool`]; arguments are validated before any side effect.
    async fn invoke(&self, name: &str, arguments: Value) -> Result<String, ToolError>;
}
