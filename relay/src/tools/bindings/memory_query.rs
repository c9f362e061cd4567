//! `memory_query`: searches long-term memory via the `openmemory` MCP server.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::mcp::McpSession;
use crate::tools::{Tool, ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};

pub const TOOL_MEMORY_QUERY: &str = "memory_query";
const REMOTE_TOOL_NAME: &str = "search_memory";
const DEFAULT_K: u64 = 5;
const MAX_K: u64 = 16;

/// Queries the `openmemory` MCP server for memories relevant to a prompt.
pub struct MemoryQueryTool {
    session: Arc<McpSession>,
    default_user_id: String,
}

impl MemoryQueryTool {
    pub fn new(session: Arc<McpSession>, default_user_id: impl Into<String>) -> Self {
        Self {
            session,
            default_user_id: default_user_id.into(),
        }
    }
}

/// Parses the remote tool's content: a text block whose text parses as
/// `{items: list[object]}`. Falls back to an empty list with a note when
/// the response doesn't match that shape.
fn parse_items(content: &ToolCallContent) -> (Vec<Value>, Option<String>) {
    match serde_json::from_str::<Value>(&content.text) {
        Ok(parsed) => match parsed.get("items").and_then(|v| v.as_array()) {
            Some(items) => (items.clone(), None),
            None => (Vec::new(), Some("remote response had no items array".to_string())),
        },
        Err(_) => (Vec::new(), Some("remote response was not JSON".to_string())),
    }
}

#[async_trait]
impl Tool for MemoryQueryTool {
    fn name(&self) -> &str {
        TOOL_MEMORY_QUERY
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_MEMORY_QUERY.to_string(),
            description: Some("Search long-term memory for entries relevant to a query.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "type": {"type": "string", "enum": ["contextual", "factual", "unified"]},
                    "k": {"type": "integer", "minimum": 1, "maximum": MAX_K, "description": "max results (default 5)"},
                    "sector": {"type": "string"},
                    "min_salience": {"type": "number", "minimum": 0, "maximum": 1},
                    "at": {"type": "string"},
                    "fact_pattern": {"type": "string"},
                    "user_id": {"type": "string"}
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing query".to_string()))?;
        let k = args
            .get("k")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_K)
            .clamp(1, MAX_K);
        let user_id = args
            .get("user_id")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.default_user_id)
            .to_string();

        let mut remote_args = json!({
            "query": query,
            "user_id": user_id,
            "limit": k,
        });
        for key in ["type", "sector", "min_salience", "at", "fact_pattern"] {
            if let Some(value) = args.get(key) {
                remote_args[key] = value.clone();
            }
        }

        let content = self
            .session
            .tools_call(REMOTE_TOOL_NAME, remote_args)
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let (items, note) = parse_items(&content);
        let returned = items.len();
        let body = json!({
            "ok": true,
            "items": items,
            "returned": returned,
            "k": k,
            "user_id": user_id,
            "note": note,
        });
        Ok(ToolCallContent {
            text: body.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_items_extracts_array_from_items_key() {
        let content = ToolCallContent {
            text: json!({"items": [{"text": "a"}, {"text": "b"}]}).to_string(),
        };
        let (items, note) = parse_items(&content);
        assert_eq!(items.len(), 2);
        assert!(note.is_none());
    }

    #[test]
    fn parse_items_notes_when_shape_is_unexpected() {
        let content = ToolCallContent {
            text: "not json".to_string(),
        };
        let (items, note) = parse_items(&content);
        assert!(items.is_empty());
        assert!(note.is_some());
    }
}
