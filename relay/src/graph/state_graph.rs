//! State graph: nodes, static edges, and conditional edges; compile and invoke.
//!
//! Add nodes with `add_node`, define the chain with `add_edge(from, to)` using
//! `START` and `END` for graph entry/exit, and use `add_conditional_edges` to
//! branch on state. A node has either one outgoing edge or conditional edges,
//! not both. `compile()` validates the graph and returns a `CompiledStateGraph`.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use crate::graph::compile_error::CompilationError;
use crate::graph::compiled::CompiledStateGraph;
use crate::graph::node::Node;

/// Sentinel for graph entry: use as `from_id` in `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";

/// Sentinel for graph exit: use as `to_id` in `add_edge(last_node_id, END)`.
pub const END: &str = "__end__";

/// Router invoked after a source node runs: given the updated state, returns
/// the key used to look up the next node id in the accompanying path map.
pub type ConditionalRouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// State graph: nodes plus explicit edges and optional conditional edges.
///
/// **Interaction**: holds `Arc<dyn Node<S>>`; `compile()` produces an
/// executable `CompiledStateGraph<S>`.
pub struct StateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    edges: Vec<(String, String)>,
    conditional_edges: HashMap<String, (ConditionalRouterFn<S>, HashMap<String, String>)>,
}

impl<S> Default for StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            conditional_edges: HashMap::new(),
        }
    }

    /// Adds a node; id must be unique. Replaces if same id.
    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Adds an edge from `from_id` to `to_id`. Use `START`/`END` for entry/exit.
    pub fn add_edge(&mut self, from_id: impl Into<String>, to_id: impl Into<String>) -> &mut Self {
        self.edges.push((from_id.into(), to_id.into()));
        self
    }

    /// Adds conditional edges from `source`: after it runs, `router(state)` returns
    /// a key looked up in `path_map` to choose the next node id (or `END`).
    pub fn add_conditional_edges(
        &mut self,
        source: impl Into<String>,
        router: ConditionalRouterFn<S>,
        path_map: HashMap<String, String>,
    ) -> &mut Self {
        self.conditional_edges.insert(source.into(), (router, path_map));
        self
    }

    /// Validates the graph and builds the executable form.
    ///
    /// Checks: every edge/conditional-target id is a known node or START/END;
    /// exactly one edge leaves START; at least one path reaches END; no node
    /// has both a plain edge and a conditional; no cycles.
    pub fn compile(self) -> Result<CompiledStateGraph<S>, CompilationError> {
        for (from, to) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            if to != END && !self.nodes.contains_key(to) {
                return Err(CompilationError::NodeNotFound(to.clone()));
            }
        }
        for (source, (_, path_map)) in &self.conditional_edges {
            if !self.nodes.contains_key(source) {
                return Err(CompilationError::NodeNotFound(source.clone()));
            }
            for target in path_map.values() {
                if target != END && !self.nodes.contains_key(target) {
                    return Err(CompilationError::InvalidConditionalPathMap(target.clone()));
                }
            }
        }

        let start_edges: Vec<_> = self
            .edges
            .iter()
            .filter(|(f, _)| f == START)
            .map(|(_, t)| t.clone())
            .collect();
        if start_edges.len() != 1 {
            return Err(CompilationError::MissingStart);
        }

        let edge_froms: HashSet<_> = self
            .edges
            .iter()
            .filter(|(f, _)| f.as_str() != START)
            .map(|(f, _)| f.clone())
            .collect();
        if edge_froms.len()
            != self
                .edges
                .iter()
                .filter(|(f, _)| f.as_str() != START)
                .count()
        {
            return Err(CompilationError::InvalidChain(
                "a node has more than one outgoing edge".into(),
            ));
        }
        for source in self.conditional_edges.keys() {
            if edge_froms.contains(source) {
                return Err(CompilationError::NodeHasBothEdgeAndConditional(
                    source.clone(),
                ));
            }
        }

        let mut next_edges: HashMap<String, String> = self
            .edges
            .iter()
            .filter(|(f, _)| f.as_str() != START)
            .map(|(f, t)| (f.clone(), t.clone()))
            .collect();
        let start_target = start_edges.into_iter().next().unwrap();
        next_edges.insert(START.to_string(), start_target.clone());

        if !Self::reaches_end(&start_target, &next_edges, &self.conditional_edges) {
            return Err(CompilationError::MissingEnd);
        }
        Self::check_acyclic(&next_edges, &self.conditional_edges)?;

        Ok(CompiledStateGraph::new(
            self.nodes,
            next_edges
                .into_iter()
                .filter(|(f, _)| f != START)
                .collect(),
            self.conditional_edges,
            start_target,
        ))
    }

    fn reaches_end(
        start: &str,
        edges: &HashMap<String, String>,
        conditional: &HashMap<String, (ConditionalRouterFn<S>, HashMap<String, String>)>,
    ) -> bool {
        let mut visited = HashSet::new();
        let mut frontier = vec![start.to_string()];
        while let Some(id) = frontier.pop() {
            if id == END {
                return true;
            }
            if !visited.insert(id.clone()) {
                continue;
            }
            if let Some(to) = edges.get(&id) {
                frontier.push(to.clone());
            }
            if let Some((_, path_map)) = conditional.get(&id) {
                frontier.extend(path_map.values().cloned());
            }
        }
        false
    }

    fn check_acyclic(
        edges: &HashMap<String, String>,
        conditional: &HashMap<String, (ConditionalRouterFn<S>, HashMap<String, String>)>,
    ) -> Result<(), CompilationError> {
        for start in edges.keys().chain(conditional.keys()) {
            let mut current = start.clone();
            let mut seen = HashSet::new();
            seen.insert(current.clone());
            loop {
                let next = match edges.get(&current) {
                    Some(n) => n.clone(),
                    None => break,
                };
                if next == END {
                    break;
                }
                if !seen.insert(next.clone()) {
                    return Err(CompilationError::InvalidChain(format!(
                        "cycle detected at {}",
                        next
                    )));
                }
                current = next;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::error::EngineError;
    use crate::graph::Next;

    #[derive(Clone, Debug, Default)]
    struct DummyState(Vec<&'static str>);

    #[derive(Clone)]
    struct DummyNode(&'static str);

    #[async_trait]
    impl Node<DummyState> for DummyNode {
        fn id(&self) -> &str {
            self.0
        }
        async fn run(&self, mut state: DummyState) -> Result<(DummyState, Next), EngineError> {
            state.0.push(self.0);
            Ok((state, Next::Continue))
        }
    }

    #[test]
    fn compile_fails_when_node_has_both_edge_and_conditional() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("a", Arc::new(DummyNode("a")));
        graph.add_node("b", Arc::new(DummyNode("b")));
        graph.add_edge(START, "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", END);
        graph.add_conditional_edges(
            "a",
            Arc::new(|_| "b".to_string()),
            [("b".to_string(), "b".to_string())].into_iter().collect(),
        );
        match graph.compile() {
            Err(CompilationError::NodeHasBothEdgeAndConditional(id)) => assert_eq!(id, "a"),
            other => panic!("expected NodeHasBothEdgeAndConditional(a), got {:?}", other),
        }
    }

    #[test]
    fn compile_fails_when_conditional_path_map_has_invalid_target() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("a", Arc::new(DummyNode("a")));
        graph.add_edge(START, "a");
        graph.add_conditional_edges(
            "a",
            Arc::new(|_| "x".to_string()),
            [("x".to_string(), "nonexistent".to_string())]
                .into_iter()
                .collect(),
        );
        match graph.compile() {
            Err(CompilationError::InvalidConditionalPathMap(id)) => assert_eq!(id, "nonexistent"),
            other => panic!("expected InvalidConditionalPathMap, got {:?}", other),
        }
    }

    #[test]
    fn compile_fails_when_start_is_missing() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("a", Arc::new(DummyNode("a")));
        graph.add_edge("a", END);
        assert!(matches!(
            graph.compile().unwrap_err(),
            CompilationError::MissingStart
        ));
    }

    #[test]
    fn compile_fails_on_cycle() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("a", Arc::new(DummyNode("a")));
        graph.add_node("b", Arc::new(DummyNode("b")));
        graph.add_edge(START, "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", "a");
        match graph.compile() {
            Err(CompilationError::InvalidChain(_)) => {}
            other => panic!("expected InvalidChain (cycle), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn linear_chain_runs_nodes_in_order() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("a", Arc::new(DummyNode("a")));
        graph.add_node("b", Arc::new(DummyNode("b")));
        graph.add_edge(START, "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", END);
        let compiled = graph.compile().unwrap();
        let out = compiled.invoke(DummyState::default()).await.unwrap();
        assert_eq!(out.0, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn conditional_edge_selects_branch() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("route", Arc::new(DummyNode("route")));
        graph.add_node("left", Arc::new(DummyNode("left")));
        graph.add_node("right", Arc::new(DummyNode("right")));
        graph.add_edge(START, "route");
        graph.add_conditional_edges(
            "route",
            Arc::new(|s: &DummyState| {
                if s.0.contains(&"route") {
                    "right".to_string()
                } else {
                    "left".to_string()
                }
            }),
            [
                ("left".to_string(), "left".to_string()),
                ("right".to_string(), "right".to_string()),
            ]
            .into_iter()
            .collect(),
        );
        graph.add_edge("left", END);
        graph.add_edge("right", END);
        let compiled = graph.compile().unwrap();
        let out = compiled.invoke(DummyState::default()).await.unwrap();
        assert_eq!(out.0, vec!["route", "right"]);
    }
}
