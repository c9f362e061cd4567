//! Tool loop (C10): drives the provider and tool registry back and forth
//! until a final assistiant message, enforcing a step cap.
//!
//! Ordinary tool failures (bad arguments against an otherwise-reachable
//! tool) are *not* fatal: they are folded into a `{"ok":false,"error":...}`
//! JSON string and fed back to the model as the tool result, so the model
//! gets a chance to correct itself. Only a missing tool or a transport
//! failure terminates the loop with a fatal `EngineError`.

use serde_json::json;

use crate::emitter::Span;
use crate::error::EngineError;
use crate::llm::{ChatParams, ChatRequest, LlmProvider, ProviderEvent, ResponseFormat};
use crate::message::Message;
use crate::tools::{ToolCallContext, ToolRegistryLocked, ToolSourceError, ToolSpec};

/// One tool invocation the loop carried out, kept around for nodes that need
/// to inspect what happened beyond the final text (e.g. Memory Retriever
/// reporting whether `memory_query` ran and with what arguments).
#[derive(Clone, Debug)]
pub struct ToolCallRecord {
    pub name: String,
    pub call_id: String,
    pub arguments: serde_json::Value,
    pub result_text: String,
}

/// Final outcome of a tool loop: the full assistant text (concatenation of
/// all `delta_text` across steps), the messages accumulated, and a record of
/// every tool call made, for nodes that need to inspect the conversation
/// afterward.
pub struct ToolLoopOutcome {
    pub text: String,
    pub messages: Vec<Message>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub steps: usize,
}

/// Runs the provider↔tools loop. `tools` is the already-firewalled subset
/// of specs visible to this node; `span` receives `thinking`/`tool_call`/
/// `tool_result` as they happen.
pub async fn run_tool_loop(
    provider: &dyn LlmProvider,
    span: &Span,
    model: &str,
    mut messages: Vec<Message>,
    params: ChatParams,
    response_format: Option<ResponseFormat>,
    tools: Vec<ToolSpec>,
    registry: &ToolRegistryLocked,
    max_steps: usize,
) -> Result<ToolLoopOutcome, EngineError> {
    if !tools.is_empty() && matches!(response_format, Some(ResponseFormat::Json)) {
        return Err(EngineError::ProviderError(
            "response_format=json cannot be combined with tools".to_string(),
        ));
    }

    let mut full_text = String::new();
    let mut tool_calls = Vec::new();
    let mut steps = 0usize;

    loop {
        if steps >= max_steps {
            return Err(EngineError::ToolStepLimit(steps));
        }
        steps += 1;

        let request = ChatRequest {
            model: model.to_string(),
            messages: messages.clone(),
            params: params.clone(),
            response_format: response_format.clone(),
            tools: tools.clone(),
        };
        let mut events = provider.stream(request).await?;

        let mut step_text = String::new();
        let mut pending_call: Option<crate::llm::ToolCallRequest> = None;
        let mut done = false;

        while let Some(event) = events.recv().await {
            match event {
                ProviderEvent::DeltaText(chunk) => {
                    step_text.push_str(&chunk);
                }
                ProviderEvent::DeltaThinking(chunk) => {
                    span.thinking(&chunk);
                }
                ProviderEvent::ToolCall(call) => {
                    pending_call = Some(call);
                }
                ProviderEvent::Done => {
                    done = true;
                    break;
                }
                ProviderEvent::Error(message) => {
                    return Err(EngineError::ProviderError(message));
                }
            }
        }
        let _ = done;

        full_text.push_str(&step_text);
        if !step_text.is_empty() {
            messages.push(Message::assistant(step_text));
        }

        let Some(call) = pending_call else {
            // No pending tool call: this is the final step.
            return Ok(ToolLoopOutcome {
                text: full_text,
                messages,
                tool_calls,
                steps,
            });
        };

        let arguments: serde_json::Value = serde_json::from_str(&call.arguments).unwrap_or(serde_json::Value::Null);
        span.tool_call(&call.call_id, &call.name, arguments.clone());

        let ctx = ToolCallContext {
            recent_messages: messages.clone(),
        };
        let result_text = match registry.call(&call.name, arguments.clone(), Some(&ctx)).await {
            Ok(content) => content.text,
            Err(ToolSourceError::InvalidInput(message)) => {
                json!({"ok": false, "error": message}).to_string()
            }
            Err(err @ ToolSourceError::NotFound(_)) => return Err(err.into()),
            Err(err @ ToolSourceError::Transport(_)) => return Err(err.into()),
        };

        span.tool_result(&call.call_id, &result_text);
        tool_calls.push(ToolCallRecord {
            name: call.name.clone(),
            call_id: call.call_id.clone(),
            arguments,
            result_text: result_text.clone(),
        });
        messages.push(Message::tool(&call.call_id, &result_text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventBus;
    use crate::llm::{ProviderEvent, ScriptedProvider, ToolCallRequest};
    use crate::tools::{Tool, ToolCallContent, ToolRegistry};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct AlwaysInvalid;

    #[async_trait]
    impl Tool for AlwaysInvalid {
        fn name(&self) -> &str {
            "world_apply_ops"
        }
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "world_apply_ops".into(),
                description: None,
                input_schema: json!({}),
            }
        }
        async fn call(
            &self,
            _args: serde_json::Value,
            _ctx: Option<&ToolCallContext>,
        ) -> Result<ToolCallContent, ToolSourceError> {
            Err(ToolSourceError::InvalidInput("disallowed path".to_string()))
        }
    }

    fn span_for_test() -> Span {
        let emitter = crate::emitter::Emitter::new(EventBus::new("t1"));
        emitter.span("llm.world_modifier", "World Modifier")
    }

    #[tokio::test]
    async fn terminates_normally_when_provider_signals_done_without_a_call() {
        let provider = ScriptedProvider::single_text("hello");
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(AlwaysInvalid));
        let registry = ToolRegistryLocked::new(registry);
        let span = span_for_test();

        let outcome = run_tool_loop(
            &provider,
            &span,
            "m",
            vec![Message::user("hi")],
            ChatParams::default(),
            None,
            vec![],
            &registry,
            4,
        )
        .await
        .unwrap();

        assert_eq!(outcome.text, "hello");
        assert_eq!(outcome.steps, 1);
        span.end_ok();
    }

    #[tokio::test]
    async fn invalid_tool_input_is_fed_back_and_loop_continues() {
        let provider = ScriptedProvider::new(vec![
            vec![
                ProviderEvent::ToolCall(ToolCallRequest {
                    call_id: "c1".into(),
                    name: "world_apply_ops".into(),
                    arguments: "{}".into(),
                }),
                ProviderEvent::Done,
            ],
            vec![ProviderEvent::DeltaText("done now".into()), ProviderEvent::Done],
        ]);
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(AlwaysInvalid));
        let registry = ToolRegistryLocked::new(registry);
        let span = span_for_test();

        let outcome = run_tool_loop(
            &provider,
            &span,
            "m",
            vec![Message::user("hi")],
            ChatParams::default(),
            None,
            vec![ToolSpec {
                name: "world_apply_ops".into(),
                description: None,
                input_schema: json!({}),
            }],
            &registry,
            4,
        )
        .await
        .unwrap();

        assert_eq!(outcome.text, "done now");
        assert_eq!(outcome.steps, 2);
        assert!(outcome
            .messages
            .iter()
            .any(|m| matches!(m, Message::Tool { content, .. } if content.contains("\"ok\":false"))));
        span.end_ok();
    }

    #[tokio::test]
    async fn exhausting_max_steps_fails_with_tool_step_limit() {
        let scripts: Vec<_> = (0..3)
            .map(|_| {
                vec![
                    ProviderEvent::ToolCall(ToolCallRequest {
                        call_id: "c1".into(),
                        name: "world_apply_ops".into(),
                        arguments: "{}".into(),
                    }),
                    ProviderEvent::Done,
                ]
            })
            .collect();
        let provider = ScriptedProvider::new(scripts);
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(AlwaysInvalid));
        let registry = ToolRegistryLocked::new(registry);
        let span = span_for_test();

        let err = run_tool_loop(
            &provider,
            &span,
            "m",
            vec![Message::user("hi")],
            ChatParams::default(),
            None,
            vec![ToolSpec {
                name: "world_apply_ops".into(),
                description: None,
                input_schema: json!({}),
            }],
            &registry,
            3,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::ToolStepLimit(3)));
        span.end_error("TOOL_STEP_LIMIT", err.to_string(), None);
    }
}
