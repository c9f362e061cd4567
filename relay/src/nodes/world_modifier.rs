//! World Modifier (`llm.world_modifier`): applies the user's turn to the
//! persistent world document via `world_apply_ops`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::EngineError;
use crate::graph::{Next, Node};
use crate::services::{Deps, Role, Services};
use crate::state::{TurnState, World};
use crate::tools::bindings::world_apply_ops::{WorldApplyOpsTool, TOOL_WORLD_APPLY_OPS};

use super::common::run_node_or_fail;

pub const NODE_ID: &str = "llm.world_modifier";
const NODE_KEY: &str = "world_modifier";

pub struct WorldModifierNode {
    deps: Arc<Deps>,
    services: Arc<Services>,
}

impl WorldModifierNode {
    pub fn new(deps: Arc<Deps>, services: Arc<Services>) -> Self {
        Self { deps, services }
    }
}

#[async_trait]
impl Node<TurnState> for WorldModifierNode {
    fn id(&self) -> &str {
        NODE_ID
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), EngineError> {
        let span = state.emitter.span(NODE_ID, "World Modifier");

        let before = state.world.to_value();
        let world_mutex = Arc::new(Mutex::new(before.clone()));
        self.services
            .tools
            .register(Arc::new(WorldApplyOpsTool::new(Arc::clone(&world_mutex))))
            .await;

        let mut values = HashMap::new();
        values.insert("USER_MESSAGE".to_string(), state.task.user_text.clone());
        values.insert("WORLD_JSON".to_string(), before.to_string());

        let outcome = match run_node_or_fail(&self.deps, self.services.tools.as_ref(), &span, NODE_KEY, Role::Planner, &values).await {
            Ok(outcome) => outcome,
            Err(e) => {
                span.end_error(e.code(), e.to_string(), None);
                return Err(e);
            }
        };

        let ops_applied = outcome
            .tool_calls
            .iter()
            .filter(|c| c.name == TOOL_WORLD_APPLY_OPS)
            .count();

        let after = world_mutex.lock().unwrap().clone();
        state.world = match World::from_value(after) {
            Ok(world) => world,
            Err(e) => {
                span.end_error(e.code(), e.to_string(), None);
                return Err(e);
            }
        };

        state.runtime.status = if ops_applied > 0 {
            format!("world updated via {ops_applied} world_apply_ops call(s)")
        } else {
            "no world changes applied".to_string()
        };

        state.runtime.node_trace.push(NODE_ID.to_string());
        span.end_ok();
        Ok((state, Next::Continue))
    }
}
