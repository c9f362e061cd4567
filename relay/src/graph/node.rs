//! Graph node trait: one step in a StateGraph.
//!
//! Receives state `S`, returns updated `S` and `Next` (continue, jump, or end).

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::EngineError;

use super::Next;

/// One step in a graph: state in, (state out, next step).
///
/// **Interaction**: implemented by each of the seven turn nodes (Router,
/// Context Builder, Memory Retriever, World Modifier, Answer, Reflect Topics,
/// Memory Writer); invoked by `CompiledStateGraph::invoke`.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node id (e.g. `"llm.router"`). Must be unique within a graph.
    fn id(&self) -> &str;

    /// One step: state in, (state out, next step).
    ///
    /// Return `Next::Continue` to follow the static edge for this node;
    /// `Next::Node(id)` to jump to a node directly; `Next::End` to stop.
    async fn run(&self, state: S) -> Result<(S, Next), EngineError>;
}
