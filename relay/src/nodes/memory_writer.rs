//! Memory Writer (`llm.memory_writer`): the last node, deciding whether
//! anything from this turn is worth writing to long-term memory via
//! `memory_store`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::error::EngineError;
use crate::graph::{Next, Node};
use crate::services::{Deps, Role, Services};
use crate::state::{Source, TurnState};
use crate::tools::bindings::memory_store::TOOL_MEMORY_STORE;

use super::common::run_node_or_fail;

pub const NODE_ID: &str = "llm.memory_writer";
const NODE_KEY: &str = "memory_writer";

pub struct MemoryWriterNode {
    deps: Arc<Deps>,
    services: Arc<Services>,
}

impl MemoryWriterNode {
    pub fn new(deps: Arc<Deps>, services: Arc<Services>) -> Self {
        Self { deps, services }
    }
}

#[async_trait]
impl Node<TurnState> for MemoryWriterNode {
    fn id(&self) -> &str {
        NODE_ID
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), EngineError> {
        let span = state.emitter.span(NODE_ID, "Memory Writer");

        let mut values = HashMap::new();
        values.insert("USER_MESSAGE".to_string(), state.task.user_text.clone());
        values.insert("ANSWER_TEXT".to_string(), state.final_.answer.clone());
        values.insert("TOPICS_JSON".to_string(), json!(state.world.topics).to_string());

        let outcome = match run_node_or_fail(&self.deps, self.services.tools.as_ref(), &span, NODE_KEY, Role::Reflect, &values).await {
            Ok(outcome) => outcome,
            Err(e) => {
                span.end_error(e.code(), e.to_string(), None);
                return Err(e);
            }
        };

        let stored_count = outcome
            .tool_calls
            .iter()
            .filter(|c| c.name == TOOL_MEMORY_STORE)
            .filter(|c| {
                serde_json::from_str::<serde_json::Value>(&c.result_text)
                    .ok()
                    .and_then(|v| v.get("stored").and_then(|s| s.as_bool()))
                    .unwrap_or(false)
            })
            .count();

        state
            .runtime
            .push_issue(format!("memory_store stored_count={stored_count}"));
        state.context.sources.push(Source {
            kind: "notes".to_string(),
            title: "Memory writer".to_string(),
            items: vec![json!({"stored_count": stored_count})],
            meta: None,
        });

        state.runtime.node_trace.push(NODE_ID.to_string());
        span.end_ok();
        Ok((state, Next::End))
    }
}
