//! The seven nodes of the turn graph, plus shared plumbing in `common`.

pub mod common;

pub mod answer;
pub mod context_builder;
pub mod memory_retriever;
pub mod memory_writer;
pub mod reflect_topics;
pub mod router;
pub mod world_modifier;

pub use answer::AnswerNode;
pub use context_builder::ContextBuilderNode;
pub use memory_retriever::MemoryRetrieverNode;
pub use memory_writer::MemoryWriterNode;
pub use reflect_topics::ReflectTopicsNode;
pub use router::RouterNode;
pub use world_modifier::WorldModifierNode;
