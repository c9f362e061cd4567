//! `chat_history_tail`: returns the last `limit` logged turns.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::chat_history::ChatHistory;
use crate::tools::{Tool, ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};

pub const TOOL_CHAT_HISTORY_TAIL: &str = "chat_history_tail";
const DEFAULT_LIMIT: usize = 5;
const HARD_MAX: usize = 50;

/// Reads the tail of the append-only chat-history log.
pub struct ChatHistoryTailTool {
    history: Arc<ChatHistory>,
}

impl ChatHistoryTailTool {
    pub fn new(history: Arc<ChatHistory>) -> Self {
        Self { history }
    }
}

#[async_trait]
impl Tool for ChatHistoryTailTool {
    fn name(&self) -> &str {
        TOOL_CHAT_HISTORY_TAIL
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_CHAT_HISTORY_TAIL.to_string(),
            description: Some("Return the last `limit` turns of chat history.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "minimum": 0, "maximum": HARD_MAX, "description": "number of turns to return (default 5)"}
                }
            }),
        }
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let limit = args
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_LIMIT)
            .min(HARD_MAX);
        let entries = self
            .history
            .tail(limit)
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let turns: Vec<_> = entries
            .iter()
            .map(|e| json!({"role": e.role, "content": e.content, "ts": e.ts}))
            .collect();
        let returned = turns.len();
        let body = json!({"turns": turns, "limit": limit, "returned": returned});
        Ok(ToolCallContent {
            text: body.to_string(),
        })
    }
}
