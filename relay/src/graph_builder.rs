//! Builds the turn graph (C12): Router branches to Context Builder (which
//! feeds Memory Retriever), to World Modifier, or straight to Answer; then
//! Answer always flows through Reflect Topics and Memory Writer.

use std::collections::HashMap;
use std::sync::Arc;

use crate::graph::{CompilationError, CompiledStateGraph, StateGraph, END, START};
use crate::nodes::{
    AnswerNode, ContextBuilderNode, MemoryRetrieverNode, MemoryWriterNode, ReflectTopicsNode,
    RouterNode, WorldModifierNode,
};
use crate::services::{Deps, Services};
use crate::state::TurnState;

const ROUTER: &str = "llm.router";
const CONTEXT_BUILDER: &str = "llm.context_builder";
const MEMORY_RETRIEVER: &str = "llm.memory_retriever";
const WORLD_MODIFIER: &str = "llm.world_modifier";
const ANSWER: &str = "llm.answer";
const REFLECT_TOPICS: &str = "llm.reflect_topics";
const MEMORY_WRITER: &str = "llm.memory_writer";

/// Routes on `task.route`, set by the Router node: `"context"` gathers
/// history/memory first, `"world"` applies a world-state change first,
/// anything else (including an absent route) goes straight to Answer.
fn route_after_router(state: &TurnState) -> String {
    match state.task.route.as_deref() {
        Some("context") => "context".to_string(),
        Some("world") => "world".to_string(),
        _ => "answer".to_string(),
    }
}

pub fn build_graph(
    deps: Arc<Deps>,
    services: Arc<Services>,
) -> Result<CompiledStateGraph<TurnState>, CompilationError> {
    let mut graph = StateGraph::<TurnState>::new();

    graph.add_node(ROUTER, Arc::new(RouterNode::new(deps.clone(), services.clone())));
    graph.add_node(
        CONTEXT_BUILDER,
        Arc::new(ContextBuilderNode::new(deps.clone(), services.clone())),
    );
    graph.add_node(
        MEMORY_RETRIEVER,
        Arc::new(MemoryRetrieverNode::new(deps.clone(), services.clone())),
    );
    graph.add_node(
        WORLD_MODIFIER,
        Arc::new(WorldModifierNode::new(deps.clone(), services.clone())),
    );
    graph.add_node(ANSWER, Arc::new(AnswerNode::new(deps.clone(), services.clone())));
    graph.add_node(
        REFLECT_TOPICS,
        Arc::new(ReflectTopicsNode::new(deps.clone(), services.clone())),
    );
    graph.add_node(
        MEMORY_WRITER,
        Arc::new(MemoryWriterNode::new(deps.clone(), services.clone())),
    );

    graph.add_edge(START, ROUTER);
    graph.add_conditional_edges(
        ROUTER,
        Arc::new(route_after_router),
        HashMap::from([
            ("context".to_string(), CONTEXT_BUILDER.to_string()),
            ("world".to_string(), WORLD_MODIFIER.to_string()),
            ("answer".to_string(), ANSWER.to_string()),
        ]),
    );
    graph.add_edge(CONTEXT_BUILDER, MEMORY_RETRIEVER);
    graph.add_edge(MEMORY_RETRIEVER, ANSWER);
    graph.add_edge(WORLD_MODIFIER, ANSWER);
    graph.add_edge(ANSWER, REFLECT_TOPICS);
    graph.add_edge(REFLECT_TOPICS, MEMORY_WRITER);
    graph.add_edge(MEMORY_WRITER, END);

    graph.compile()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatParams, ScriptedProvider};
    use crate::prompt::TemplateLoader;
    use crate::services::{Role, RoleConfig};
    use crate::tools::{ToolRegistry, ToolRegistryLocked};

    fn test_deps() -> Arc<Deps> {
        let mut roles = HashMap::new();
        for role in [Role::Router, Role::Planner, Role::Reflect, Role::Answer] {
            roles.insert(
                role,
                RoleConfig {
                    model: "test-model".to_string(),
                    params: ChatParams::default(),
                    response_format: None,
                },
            );
        }
        Arc::new(Deps::new(
            Arc::new(ScriptedProvider::new(vec![])),
            TemplateLoader::embedded(),
            roles,
            8,
        ))
    }

    fn test_services() -> Arc<Services> {
        Arc::new(Services::new(
            Arc::new(ToolRegistryLocked::new(ToolRegistry::new())),
            std::env::temp_dir().join("graph_builder_test_history.jsonl"),
            std::env::temp_dir().join("graph_builder_test_world.json"),
            "UTC",
            None,
            "default-user",
            20,
        ))
    }

    #[test]
    fn graph_compiles_with_all_branches_wired() {
        let graph = build_graph(test_deps(), test_services());
        assert!(graph.is_ok());
    }
}
