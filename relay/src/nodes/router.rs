//! Router (`llm.router`): the graph's entry node. Decides whether this turn
//! needs context gathering, a world-state update, or goes straight to answer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::graph::{Next, Node};
use crate::json_extract::extract_first_json_object;
use crate::services::{Deps, Role, Services};
use crate::state::TurnState;

use super::common::run_node_or_fail;

pub const NODE_ID: &str = "llm.router";
const NODE_KEY: &str = "router";
const DEFAULT_ROUTE: &str = "answer";

pub struct RouterNode {
    deps: Arc<Deps>,
    services: Arc<Services>,
}

impl RouterNode {
    pub fn new(deps: Arc<Deps>, services: Arc<Services>) -> Self {
        Self { deps, services }
    }
}

#[async_trait]
impl Node<TurnState> for RouterNode {
    fn id(&self) -> &str {
        NODE_ID
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), EngineError> {
        let span = state.emitter.span(NODE_ID, "Router");

        let mut values = HashMap::new();
        values.insert("USER_MESSAGE".to_string(), state.task.user_text.clone());
        values.insert("NOW".to_string(), state.runtime.now_iso.clone());
        values.insert("TZ".to_string(), state.runtime.timezone.clone());
        values.insert("WORLD_JSON".to_string(), state.world.to_value().to_string());

        let outcome = match run_node_or_fail(&self.deps, self.services.tools.as_ref(), &span, NODE_KEY, Role::Router, &values).await {
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

        let route = parsed
            .get("route")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_ROUTE)
            .to_string();
        if let Some(language) = parsed.get("language").and_then(|v| v.as_str()) {
            state.task.language = language.to_string();
        }
        if let Some(status) = parsed.get("status").and_then(|v| v.as_str()) {
            state.runtime.status = status.to_string();
        }
        state.task.route = Some(route);
        state.runtime.node_trace.push(NODE_ID.to_string());

        span.end_ok();
        Ok((state, Next::Continue))
    }
}
