//! Executable graph produced by `StateGraph::compile`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::EngineError;

use super::next::Next;
use super::node::Node;
use super::state_graph::{ConditionalRouterFn, END};

/// A validated, executable graph. Built only via `StateGraph::compile`.
pub struct CompiledStateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    edges: HashMap<String, String>,
    conditional_edges: HashMap<String, (ConditionalRouterFn<S>, HashMap<String, String>)>,
    start: String,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub(super) fn new(
        nodes: HashMap<String, Arc<dyn Node<S>>>,
        edges: HashMap<String, String>,
        conditional_edges: HashMap<String, (ConditionalRouterFn<S>, HashMap<String, String>)>,
        start: String,
    ) -> Self {
        Self {
            nodes,
            edges,
            conditional_edges,
            start,
        }
    }

    /// Runs the graph from START, following each node's `Next` until `END`.
    #[instrument(skip(self, state), fields(node = tracing::field::Empty))]
    pub async fn invoke(&self, state: S) -> Result<S, EngineError> {
        let mut current = self.start.clone();
        let mut state = state;
        loop {
            let node = self
                .nodes
                .get(&current)
                .unwrap_or_else(|| panic!("compiled graph references unknown node {current}"));
            debug!(node = %current, "running node");
            let (next_state, next) = node.run(state).await?;
            state = next_state;
            current = match next {
                Next::End => break,
                Next::Node(id) => id,
                Next::Continue => self.resolve_continue(&current, &state),
            };
            if current == END {
                break;
            }
        }
        Ok(state)
    }

    fn resolve_continue(&self, from: &str, state: &S) -> String {
        if let Some((router, path_map)) = self.conditional_edges.get(from) {
            let key = router(state);
            return path_map.get(&key).cloned().unwrap_or(key);
        }
        self.edges
            .get(from)
            .cloned()
            .unwrap_or_else(|| END.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::graph::StateGraph;

    #[derive(Clone, Debug, Default)]
    struct S(Vec<&'static str>);

    struct Echo(&'static str);

    #[async_trait]
    impl Node<S> for Echo {
        fn id(&self) -> &str {
            self.0
        }
        async fn run(&self, mut state: S) -> Result<(S, Next), EngineError> {
            state.0.push(self.0);
            Ok((state, Next::Continue))
        }
    }

    struct JumpToEnd;

    #[async_trait]
    impl Node<S> for JumpToEnd {
        fn id(&self) -> &str {
            "jump"
        }
        async fn run(&self, mut state: S) -> Result<(S, Next), EngineError> {
            state.0.push("jump");
            Ok((state, Next::End))
        }
    }

    #[tokio::test]
    async fn next_end_stops_before_following_static_edge() {
        let mut g = StateGraph::<S>::new();
        g.add_node("a", Arc::new(JumpToEnd));
        g.add_node("b", Arc::new(Echo("b")));
        g.add_edge(super::super::state_graph::START, "a");
        g.add_edge("a", "b");
        g.add_edge("b", END);
        let compiled = g.compile().unwrap();
        let out = compiled.invoke(S::default()).await.unwrap();
        assert_eq!(out.0, vec!["jump"]);
    }
}
