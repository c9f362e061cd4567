//! Typed event payloads, tagged by `type` in the wire representation.
//!
//! One variant per kind named in the turn event contract: node spans
//! (`node_start`/`node_end_ok`/`node_end_error`), the thinking and assistant
//! delta groups (each a `*_start`/`*_delta`/`*_end` triple), tool calls, world
//! commits, log lines, and the two turn boundaries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What happened, carried by one `Event`. Serializes with `type` as the tag
/// and the variant's fields flattened alongside it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    TurnStart {
        user_text: String,
        provider: String,
        models: Value,
    },
    TurnEndOk {
        duration_ms: i64,
    },
    TurnEndError {
        code: String,
        message: String,
    },
    NodeStart {
        node_id: String,
        span_id: String,
        label: String,
    },
    NodeEndOk {
        node_id: String,
        span_id: String,
        duration_ms: i64,
    },
    NodeEndError {
        node_id: String,
        span_id: String,
        duration_ms: i64,
        code: String,
        message: String,
        details: Option<Value>,
    },
    ThinkingStart {
        node_id: String,
        span_id: String,
    },
    ThinkingDelta {
        node_id: String,
        span_id: String,
        text: String,
    },
    ThinkingEnd {
        node_id: String,
        span_id: String,
    },
    AssistantStart {
        message_id: String,
    },
    AssistantDelta {
        message_id: String,
        text: String,
    },
    AssistantEnd {
        message_id: String,
    },
    ToolCall {
        node_id: String,
        span_id: String,
        call_id: String,
        name: String,
        arguments: Value,
    },
    ToolResult {
        node_id: String,
        span_id: String,
        call_id: String,
        text: String,
    },
    LogLine {
        node_id: String,
        span_id: String,
        level: String,
        message: String,
        logger: String,
        fields: Value,
    },
    WorldCommit {
        world_before: Value,
        world_after: Value,
        delta: Value,
    },
}

impl EventKind {
    /// Stable discriminant name, independent of serde's `type` tag string,
    /// used for log fields and test assertions.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::TurnStart { .. } => "turn_start",
            EventKind::TurnEndOk { .. } => "turn_end_ok",
            EventKind::TurnEndError { .. } => "turn_end_error",
            EventKind::NodeStart { .. } => "node_start",
            EventKind::NodeEndOk { .. } => "node_end_ok",
            EventKind::NodeEndError { .. } => "node_end_error",
            EventKind::ThinkingStart { .. } => "thinking_start",
            EventKind::ThinkingDelta { .. } => "thinking_delta",
            EventKind::ThinkingEnd { .. } => "thinking_end",
            EventKind::AssistantStart { .. } => "assistant_start",
            EventKind::AssistantDelta { .. } => "assistant_delta",
            EventKind::AssistantEnd { .. } => "assistant_end",
            EventKind::ToolCall { .. } => "tool_call",
            EventKind::ToolResult { .. } => "tool_result",
            EventKind::LogLine { .. } => "log_line",
            EventKind::WorldCommit { .. } => "world_commit",
        }
    }

    /// `span_id` carried by `node_*`/`thinking_*`/`tool_*`/`log_line` events, if any.
    pub fn span_id(&self) -> Option<&str> {
        match self {
            EventKind::NodeStart { span_id, .. }
            | EventKind::NodeEndOk { span_id, .. }
            | EventKind::NodeEndError { span_id, .. }
            | EventKind::ThinkingStart { span_id, .. }
            | EventKind::ThinkingDelta { span_id, .. }
            | EventKind::ThinkingEnd { span_id, .. }
            | EventKind::ToolCall { span_id, .. }
            | EventKind::ToolResult { span_id, .. }
            | EventKind::LogLine { span_id, .. } => Some(span_id.as_str()),
            _ => None,
        }
    }
}
