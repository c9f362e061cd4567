//! Context Builder (`llm.context_builder`): decides whether chat history
//! and/or long-term memory are worth consulting before answering.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::error::EngineError;
use crate::graph::{Next, Node};
use crate::json_extract::extract_first_json_object;
use crate::services::{Deps, Role, Services};
use crate::state::{MemoryRequest, Source, TurnState};
use crate::tools::bindings::chat_history_tail::TOOL_CHAT_HISTORY_TAIL;

use super::common::run_node_or_fail;

pub const NODE_ID: &str = "llm.context_builder";
const NODE_KEY: &str = "context_builder";
const DEFAULT_MEMORY_K: usize = 5;

pub struct ContextBuilderNode {
    deps: Arc<Deps>,
    services: Arc<Services>,
}

impl ContextBuilderNode {
    pub fn new(deps: Arc<Deps>, services: Arc<Services>) -> Self {
        Self { deps, services }
    }
}

#[async_trait]
impl Node<TurnState> for ContextBuilderNode {
    fn id(&self) -> &str {
        NODE_ID
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), EngineError> {
        let span = state.emitter.span(NODE_ID, "Context Builder");

        let mut values = HashMap::new();
        values.insert("USER_MESSAGE".to_string(), state.task.user_text.clone());
        values.insert("WORLD_JSON".to_string(), state.world.to_value().to_string());

        let outcome = match run_node_or_fail(&self.deps, self.services.tools.as_ref(), &span, NODE_KEY, Role::Planner, &values).await {
            Ok(outcome) => outcome,
            Err(e) => {
                span.end_error(e.code(), e.to_string(), None);
                return Err(e);
            }
        };

        let parsed = match extract_first_json_object(&outcome.text) {
            Ok(v) => v,
            Err(e) => {
                span.end_error(e.code(), e.to_string(), None);
                return Err(e);
            }
        };

        let want_history = parsed.get("want_history").and_then(|v| v.as_bool()).unwrap_or(false);
        state.context.want_history = want_history;

        if let Some(k) = parsed.get("memory_request").and_then(|r| r.get("k")).and_then(|v| v.as_u64()) {
            state.task.memory_request = Some(MemoryRequest { k: k as usize });
        } else if parsed.get("memory_request").is_some() {
            state.task.memory_request = Some(MemoryRequest { k: DEFAULT_MEMORY_K });
        }

        if let Some(status) = parsed.get("status").and_then(|v| v.as_str()) {
            state.context.status = Some(status.to_string());
        }

        if want_history {
            match self
                .services
                .tools
                .call(TOOL_CHAT_HISTORY_TAIL, json!({}), None)
                .await
            {
                Ok(content) => {
                    let parsed_turns: serde_json::Value = serde_json::from_str(&content.text).unwrap_or(json!({}));
                    let turns = parsed_turns.get("turns").cloned().unwrap_or(json!([]));
                    let items = turns.as_array().cloned().unwrap_or_default();
                    state.context.sources.push(Source {
                        kind: "history".to_string(),
                        title: "Recent turns".to_string(),
                        items,
                        meta: None,
                    });
                }
                Err(e) => {
                    state.runtime.push_issue(format!("chat_history_tail failed: {e}"));
                }
            }
        }

        state.runtime.node_trace.push(NODE_ID.to_string());
        span.end_ok();
        Ok((state, Next::Continue))
    }
}
