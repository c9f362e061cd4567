//! Routing decision returned by a node.

/// Where the graph should go after a node finishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Next {
    /// Follow the static edge registered for this node (or its conditional router).
    Continue,
    /// Jump directly to the named node, bypassing the static edge.
    Node(String),
    /// Stop the graph.
    End,
}
