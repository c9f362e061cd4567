//! Tool trait and the types that cross the tool-call boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Description of a callable tool, as surfaced to the LLM provider and to
/// `tools/list` over MCP.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: serde_json::Value,
}

/// Plain-text result of a tool call, fed back to the model as a `Message::Tool`.
#[derive(Clone, Debug)]
pub struct ToolCallContent {
    pub text: String,
}

/// Per-call context a tool may need beyond its arguments (e.g. recent turns).
#[derive(Clone, Debug, Default)]
pub struct ToolCallContext {
    pub recent_messages: Vec<crate::message::Message>,
}

/// Failure modes for tool execution, folded into `EngineError::ToolError` at
/// the tool-loop boundary.
#[derive(Debug, Error, Clone)]
pub enum ToolSourceError {
    #[error("invalid tool input: {0}")]
    InvalidInput(String),
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("tool transport error: {0}")]
    Transport(String),
}

impl From<ToolSourceError> for crate::error::EngineError {
    fn from(e: ToolSourceError) -> Self {
        crate::error::EngineError::ToolError(e.to_string())
    }
}

/// A single tool that can be called by the LLM, local or MCP-backed.
///
/// **Interaction**: registered by name in `ToolRegistry`; invoked by the tool
/// loop once the model emits a `ToolCallRequest` naming it.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name, matched against the model's tool call.
    fn name(&self) -> &str;

    /// Description and JSON schema surfaced to the provider.
    fn spec(&self) -> ToolSpec;

    /// Executes the tool. `ctx` carries per-call context a tool may need
    /// (e.g. recent messages) beyond its arguments.
    async fn call(
        &self,
        args: serde_json::Value,
        ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError>;
}
