//! Engine-wide error taxonomy.
//!
//! One enum covers every component so node code can propagate with `?` through
//! the prompt renderer, JSON extractor, tool loop, world-state store and MCP
//! client alike. `code()` returns the stable taxonomy string used in
//! `node_end_error`/`turn_end_error` event payloads.

use thiserror::Error;

/// All failure modes the engine can surface, across every component.
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    #[error("unresolved prompt tokens: {0:?}")]
    PromptUnresolvedTokens(Vec<String>),

    #[error("no json object found in text")]
    JsonNotFound,

    #[error("json parse error: {0}")]
    JsonParseError(String),

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("tool error: {0}")]
    ToolError(String),

    #[error("tool step limit exceeded ({0} steps)")]
    ToolStepLimit(usize),

    #[error("invalid world operation: {0}")]
    WorldOpInvalid(String),

    #[error("mcp error: {0}")]
    McpError(String),

    /// Wraps any other variant for node-level observability. Carries the
    /// inner error's taxonomy code in its own message (see `fmt::Display` below)
    /// so `message~="PROMPT_UNRESOLVED_TOKENS"`-style checks still match.
    #[error("{0}: {1}")]
    NodeError(&'static str, String),

    /// Emitted at turn_end when the worker fails; same shape as `NodeError`.
    #[error("{0}: {1}")]
    TurnError(&'static str, String),

    #[error("io error: {0}")]
    Io(String),
}

impl EngineError {
    /// Stable taxonomy code, as named in the error handling design.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::PromptUnresolvedTokens(_) => "PROMPT_UNRESOLVED_TOKENS",
            EngineError::JsonNotFound => "JSON_NOT_FOUND",
            EngineError::JsonParseError(_) => "JSON_PARSE_ERROR",
            EngineError::ProviderError(_) => "PROVIDER_ERROR",
            EngineError::ToolError(_) => "TOOL_ERROR",
            EngineError::ToolStepLimit(_) => "TOOL_STEP_LIMIT",
            EngineError::WorldOpInvalid(_) => "WORLD_OP_INVALID",
            EngineError::McpError(_) => "MCP_ERROR",
            EngineError::NodeError(..) => "NODE_ERROR",
            EngineError::TurnError(..) => "TURN_ERROR",
            EngineError::Io(_) => "IO_ERROR",
        }
    }

    /// Wraps any error as a `NODE_ERROR`, keeping the original taxonomy code and
    /// message visible in the wrapped message text.
    pub fn into_node_error(self) -> EngineError {
        let inner_code = self.code();
        EngineError::NodeError(inner_code, self.to_string())
    }

    /// Wraps any error as a `TURN_ERROR`, used by the runner when the worker fails.
    pub fn into_turn_error(self) -> EngineError {
        let inner_code = self.code();
        EngineError::TurnError(inner_code, self.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::JsonParseError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_matches_taxonomy_for_each_variant() {
        assert_eq!(
            EngineError::PromptUnresolvedTokens(vec!["X".into()]).code(),
            "PROMPT_UNRESOLVED_TOKENS"
        );
        assert_eq!(EngineError::JsonNotFound.code(), "JSON_NOT_FOUND");
        assert_eq!(EngineError::ToolStepLimit(8).code(), "TOOL_STEP_LIMIT");
        assert_eq!(
            EngineError::WorldOpInvalid("x".into()).code(),
            "WORLD_OP_INVALID"
        );
    }

    #[test]
    fn node_error_preserves_inner_taxonomy_in_message() {
        let inner = EngineError::PromptUnresolvedTokens(vec!["UNKNOWN".into()]);
        let wrapped = inner.into_node_error();
        assert_eq!(wrapped.code(), "NODE_ERROR");
        assert!(wrapped.to_string().contains("PROMPT_UNRESOLVED_TOKENS"));
    }

    #[test]
    fn turn_error_preserves_inner_taxonomy_in_message() {
        let inner = EngineError::ToolStepLimit(8);
        let wrapped = inner.into_turn_error();
        assert_eq!(wrapped.code(), "TURN_ERROR");
        assert!(wrapped.to_string().contains("TOOL_STEP_LIMIT"));
    }
}
