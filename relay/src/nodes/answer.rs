//! Answer (`llm.answer`): the one node that speaks to the user, streaming
//! assistant deltas live rather than waiting for a full completion.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::error::EngineError;
use crate::graph::{Next, Node};
use crate::llm::{ChatRequest, ProviderEvent};
use crate::message::Message;
use crate::prompt::render_prompt;
use crate::services::{Deps, Role, Services};
use crate::state::TurnState;

pub const NODE_ID: &str = "llm.answer";
const NODE_KEY: &str = "answer";

pub struct AnswerNode {
    deps: Arc<Deps>,
    services: Arc<Services>,
}

impl AnswerNode {
    pub fn new(deps: Arc<Deps>, services: Arc<Services>) -> Self {
        Self { deps, services }
    }
}

#[async_trait]
impl Node<TurnState> for AnswerNode {
    fn id(&self) -> &str {
        NODE_ID
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), EngineError> {
        let span = state.emitter.span(NODE_ID, "Answer");

        let mut values = HashMap::new();
        values.insert("USER_MESSAGE".to_string(), state.task.user_text.clone());
        values.insert("STATUS".to_string(), state.runtime.status.clone());
        values.insert("NOW_ISO".to_string(), state.runtime.now_iso.clone());
        values.insert("TIMEZONE".to_string(), state.runtime.timezone.clone());
        values.insert("WORLD_JSON".to_string(), state.world.to_value().to_string());
        values.insert(
            "CONTEXT_JSON".to_string(),
            json!({
                "sources": state.context.sources,
                "status": state.context.status,
            })
            .to_string(),
        );
        values.insert("ISSUES_JSON".to_string(), json!(state.runtime.issues).to_string());

        let template = self.deps.prompts.template_for(NODE_KEY);
        let rendered = match render_prompt(&template, &values) {
            Ok(text) => text,
            Err(e) => {
                span.end_error(e.code(), e.to_string(), None);
                return Err(e);
            }
        };

        let role_config = self.deps.role_config(Role::Answer);
        let request = ChatRequest {
            model: role_config.model.clone(),
            messages: vec![Message::user(rendered)],
            params: role_config.params.clone(),
            response_format: None,
            tools: vec![],
        };

        let mut events = match self.deps.provider.stream(request).await {
            Ok(events) => events,
            Err(e) => {
                span.end_error(e.code(), e.to_string(), None);
                return Err(e);
            }
        };

        let message_id = Uuid::new_v4().to_string();
        state.emitter.assistant_start(&message_id);
        let mut full_text = String::new();
        let mut stream_error = None;

        while let Some(event) = events.recv().await {
            match event {
                ProviderEvent::DeltaText(chunk) => {
                    full_text.push_str(&chunk);
                    state.emitter.assistant_delta(&message_id, chunk);
                }
                ProviderEvent::DeltaThinking(chunk) => {
                    span.thinking(&chunk);
                }
                ProviderEvent::ToolCall(_) => {}
                ProviderEvent::Done => break,
                ProviderEvent::Error(message) => {
                    stream_error = Some(EngineError::ProviderError(message));
                    break;
                }
            }
        }
        state.emitter.assistant_end(&message_id);

        if let Some(e) = stream_error {
            span.end_error(e.code(), e.to_string(), None);
            return Err(e);
        }

        state.final_.answer = full_text;
        state.runtime.node_trace.push(NODE_ID.to_string());
        span.end_ok();
        Ok((state, Next::Continue))
    }
}
