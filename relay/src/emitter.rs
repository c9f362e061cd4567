//! Node-facing façade over `EventBus`: owns turn/span timing and the
//! start/delta/end grouping rules so node code never constructs an
//! `EventKind` by hand.

use serde_json::Value;
use uuid::Uuid;

use crate::event::{Event, EventBus, EventKind};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Per-turn emitter handed to every node through `Services`/state.
#[derive(Clone, Debug)]
pub struct Emitter {
    bus: EventBus,
}

impl Emitter {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn start_turn(&self, user_text: impl Into<String>, provider: impl Into<String>, models: Value) {
        self.bus.emit(EventKind::TurnStart {
            user_text: user_text.into(),
            provider: provider.into(),
            models,
        });
    }

    pub fn end_turn_ok(&self, duration_ms: i64) {
        self.bus.emit(EventKind::TurnEndOk { duration_ms });
    }

    pub fn end_turn_error(&self, code: impl Into<String>, message: impl Into<String>) {
        self.bus.emit(EventKind::TurnEndError {
            code: code.into(),
            message: message.into(),
        });
    }

    pub fn assistant_start(&self, message_id: impl Into<String>) {
        self.bus.emit(EventKind::AssistantStart {
            message_id: message_id.into(),
        });
    }

    pub fn assistant_delta(&self, message_id: impl Into<String>, text: impl Into<String>) {
        self.bus.emit(EventKind::AssistantDelta {
            message_id: message_id.into(),
            text: text.into(),
        });
    }

    pub fn assistant_end(&self, message_id: impl Into<String>) {
        self.bus.emit(EventKind::AssistantEnd {
            message_id: message_id.into(),
        });
    }

    /// Convenience for a non-streamed final assistant message: emits the
    /// full start/delta/end group in one call, with a freshly minted id.
    pub fn assistant_full(&self, text: impl Into<String>) -> String {
        let message_id = Uuid::new_v4().to_string();
        self.assistant_start(&message_id);
        self.assistant_delta(&message_id, text);
        self.assistant_end(&message_id);
        message_id
    }

    /// Opens a span for `node_id`, emitting `node_start` then
    /// `thinking_start`. The returned `Span` must be closed with
    /// `end_ok`/`end_error`.
    pub fn span(&self, node_id: impl Into<String>, label: impl Into<String>) -> Span {
        let node_id = node_id.into();
        let span_id = Uuid::new_v4().to_string();
        self.bus.emit(EventKind::NodeStart {
            node_id: node_id.clone(),
            span_id: span_id.clone(),
            label: label.into(),
        });
        self.bus.emit(EventKind::ThinkingStart {
            node_id: node_id.clone(),
            span_id: span_id.clone(),
        });
        Span {
            bus: self.bus.clone(),
            node_id,
            span_id,
            t0_ms: now_ms(),
            closed: false,
        }
    }

    pub fn world_commit(&self, world_before: Value, world_after: Value, delta: Value) {
        self.bus.emit(EventKind::WorldCommit {
            world_before,
            world_after,
            delta,
        });
    }
}

/// A node-scoped timed region. Groups thinking deltas and log lines under
/// one `span_id`; always closed exactly once with `end_ok` or `end_error`.
pub struct Span {
    bus: EventBus,
    node_id: String,
    span_id: String,
    t0_ms: i64,
    closed: bool,
}

impl Span {
    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    /// Forwards a thinking delta; a no-op on empty text so nodes can pass
    /// provider output through unconditionally.
    pub fn thinking(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            return;
        }
        self.bus.emit(EventKind::ThinkingDelta {
            node_id: self.node_id.clone(),
            span_id: self.span_id.clone(),
            text: text.to_string(),
        });
    }

    pub fn log(
        &self,
        level: impl Into<String>,
        message: impl Into<String>,
        logger: impl Into<String>,
        fields: Value,
    ) {
        self.bus.emit(EventKind::LogLine {
            node_id: self.node_id.clone(),
            span_id: self.span_id.clone(),
            level: level.into(),
            message: message.into(),
            logger: logger.into(),
            fields,
        });
    }

    pub fn tool_call(&self, call_id: impl Into<String>, name: impl Into<String>, arguments: Value) {
        self.bus.emit(EventKind::ToolCall {
            node_id: self.node_id.clone(),
            span_id: self.span_id.clone(),
            call_id: call_id.into(),
            name: name.into(),
            arguments,
        });
    }

    pub fn tool_result(&self, call_id: impl Into<String>, text: impl Into<String>) {
        self.bus.emit(EventKind::ToolResult {
            node_id: self.node_id.clone(),
            span_id: self.span_id.clone(),
            call_id: call_id.into(),
            text: text.into(),
        });
    }

    fn duration_ms(&self) -> i64 {
        (now_ms() - self.t0_ms).max(0)
    }

    fn end_thinking(&mut self) {
        self.bus.emit(EventKind::ThinkingEnd {
            node_id: self.node_id.clone(),
            span_id: self.span_id.clone(),
        });
        self.closed = true;
    }

    pub fn end_ok(mut self) {
        self.end_thinking();
        self.bus.emit(EventKind::NodeEndOk {
            node_id: self.node_id.clone(),
            span_id: self.span_id.clone(),
            duration_ms: self.duration_ms(),
        });
    }

    pub fn end_error(mut self, code: impl Into<String>, message: impl Into<String>, details: Option<Value>) {
        self.end_thinking();
        self.bus.emit(EventKind::NodeEndError {
            node_id: self.node_id.clone(),
            span_id: self.span_id.clone(),
            duration_ms: self.duration_ms(),
            code: code.into(),
            message: message.into(),
            details,
        });
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if !self.closed {
            self.end_thinking();
            self.bus.emit(EventKind::NodeEndError {
                node_id: self.node_id.clone(),
                span_id: self.span_id.clone(),
                duration_ms: self.duration_ms(),
                code: "NODE_ERROR".to_string(),
                message: "span dropped without an explicit end".to_string(),
                details: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_kind_at(events: &[Event], index: usize) -> &EventKind {
        &events[index].kind
    }

    #[test]
    fn span_emits_start_thinking_and_end_ok_in_order() {
        let bus = EventBus::new("t1");
        let emitter = Emitter::new(bus.clone());
        let span = emitter.span("llm.router", "Router");
        span.thinking("considering");
        span.end_ok();
        let events = bus.events();
        let names: Vec<&str> = events.iter().map(|e| e.kind.name()).collect();
        assert_eq!(
            names,
            vec!["node_start", "thinking_start", "thinking_delta", "thinking_end", "node_end_ok"]
        );
    }

    #[test]
    fn thinking_is_a_no_op_on_empty_text() {
        let bus = EventBus::new("t1");
        let emitter = Emitter::new(bus.clone());
        let span = emitter.span("llm.answer", "Answer");
        span.thinking("");
        span.end_ok();
        let events = bus.events();
        assert!(!events.iter().any(|e| e.kind.name() == "thinking_delta"));
    }

    #[test]
    fn end_error_carries_taxonomy_code_and_closes_thinking_first() {
        let bus = EventBus::new("t1");
        let emitter = Emitter::new(bus.clone());
        let span = emitter.span("llm.world_modifier", "World Modifier");
        span.end_error("WORLD_OP_INVALID", "disallowed path", None);
        let events = bus.events();
        assert_eq!(event_kind_at(&events, 2).name(), "thinking_end");
        match event_kind_at(&events, 3) {
            EventKind::NodeEndError { code, .. } => assert_eq!(code, "WORLD_OP_INVALID"),
            other => panic!("expected NodeEndError, got {other:?}"),
        }
    }

    #[test]
    fn assistant_full_emits_a_well_nested_group_with_stable_message_id() {
        let bus = EventBus::new("t1");
        let emitter = Emitter::new(bus.clone());
        let message_id = emitter.assistant_full("hello there");
        let events = bus.events();
        assert_eq!(events.len(), 3);
        for e in &events {
            match &e.kind {
                EventKind::AssistantStart { message_id: m }
                | EventKind::AssistantDelta { message_id: m, .. }
                | EventKind::AssistantEnd { message_id: m } => assert_eq!(m, &message_id),
                other => panic!("unexpected kind {other:?}"),
            }
        }
    }

    #[test]
    fn dropping_a_span_without_closing_still_emits_node_end_error() {
        let bus = EventBus::new("t1");
        {
            let emitter = Emitter::new(bus.clone());
            let _span = emitter.span("llm.router", "Router");
        }
        let events = bus.events();
        assert_eq!(events.last().unwrap().kind.name(), "node_end_error");
    }
}
