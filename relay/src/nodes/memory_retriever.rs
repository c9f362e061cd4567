//! Memory Retriever (`llm.memory_retriever`): optionally calls `memory_query`
//! to pull relevant long-term memories into context before answering.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::error::EngineError;
use crate::graph::{Next, Node};
use crate::services::{Deps, Role, Services};
use crate::state::{Source, TurnState};
use crate::tools::bindings::memory_query::TOOL_MEMORY_QUERY;

use super::common::run_node_or_fail;

pub const NODE_ID: &str = "llm.memory_retriever";
const NODE_KEY: &str = "memory_retriever";
const DEFAULT_K: usize = 5;

pub struct MemoryRetrieverNode {
    deps: Arc<Deps>,
    services: Arc<Services>,
}

impl MemoryRetrieverNode {
    pub fn new(deps: Arc<Deps>, services: Arc<Services>) -> Self {
        Self { deps, services }
    }
}

#[async_trait]
impl Node<TurnState> for MemoryRetrieverNode {
    fn id(&self) -> &str {
        NODE_ID
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), EngineError> {
        let span = state.emitter.span(NODE_ID, "Memory Retriever");

        let desired_n = state
            .task
            .memory_request
            .as_ref()
            .map(|r| r.k)
            .unwrap_or(DEFAULT_K);

        let mut values = HashMap::new();
        values.insert("USER_MESSAGE".to_string(), state.task.user_text.clone());
        values.insert("DESIRED_N".to_string(), desired_n.to_string());

        let outcome = match run_node_or_fail(&self.deps, self.services.tools.as_ref(), &span, NODE_KEY, Role::Reflect, &values).await {
            Ok(outcome) => outcome,
            Err(e) => {
                span.end_error(e.code(), e.to_string(), None);
                return Err(e);
            }
        };

        let query_call = outcome.tool_calls.iter().find(|c| c.name == TOOL_MEMORY_QUERY);
        match query_call {
            Some(call) => {
                let query_text = call
                    .arguments
                    .get("query")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&state.task.user_text)
                    .to_string();
                let result: serde_json::Value = serde_json::from_str(&call.result_text).unwrap_or(json!({}));
                let items = result.get("items").cloned().unwrap_or(json!([])).as_array().cloned().unwrap_or_default();
                let returned = items.len();
                state.context.sources.push(Source {
                    kind: "memories".to_string(),
                    title: "Long-term memories".to_string(),
                    items,
                    meta: Some(json!({
                        "query_text": query_text,
                        "requested_limit": desired_n,
                        "returned": returned,
                    })),
                });
                state
                    .runtime
                    .push_issue(format!("memory_query did_query=true returned={returned}"));
            }
            None => {
                state.runtime.push_issue("memory_query did_query=false".to_string());
            }
        }

        state.runtime.node_trace.push(NODE_ID.to_string());
        span.end_ok();
        Ok((state, Next::Continue))
    }
}
