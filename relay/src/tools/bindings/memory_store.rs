//! `memory_store`: writes a memory entry via the `openmemory` MCP server.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::mcp::McpSession;
use crate::tools::{Tool, ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};

pub const TOOL_MEMORY_STORE: &str = "memory_store";
const REMOTE_TOOL_NAME: &str = "add_memory";

/// Writes one memory entry to the `openmemory` MCP server, tagged with the
/// default memory owner unless the caller overrides `user_id`.
pub struct MemoryStoreTool {
    session: Arc<McpSession>,
    default_user_id: String,
}

impl MemoryStoreTool {
    pub fn new(session: Arc<McpSession>, default_user_id: impl Into<String>) -> Self {
        Self {
            session,
            default_user_id: default_user_id.into(),
        }
    }
}

#[async_trait]
impl Tool for MemoryStoreTool {
    fn name(&self) -> &str {
        TOOL_MEMORY_STORE
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_MEMORY_STORE.to_string(),
            description: Some("Write one memory entry for later recall.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content": {"type": "string"},
                    "type": {"type": "string", "enum": ["contextual", "factual", "both"]},
                    "facts": {"type": "array", "items": {"type": "string"}},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "metadata": {"type": "object"},
                    "user_id": {"type": "string"}
                },
                "required": ["content"]
            }),
        }
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let content = args
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing content".to_string()))?;
        let user_id = args
            .get("user_id")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.default_user_id)
            .to_string();

        let mut remote_args = json!({"content": content, "user_id": user_id});
        for key in ["type", "facts", "tags", "metadata"] {
            if let Some(value) = args.get(key) {
                remote_args[key] = value.clone();
            }
        }

        self.session
            .tools_call(REMOTE_TOOL_NAME, remote_args)
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;

        let summary: String = if content.chars().count() > 80 {
            let mut truncated: String = content.chars().take(80).collect();
            truncated.push('…');
            truncated
        } else {
            content.to_string()
        };
        let body = json!({
            "ok": true,
            "stored": true,
            "user_id": user_id,
            "summary": summary,
        });
        Ok(ToolCallContent {
            text: body.to_string(),
        })
    }
}
