//! Local tool bindings backed by `Services`, registered alongside MCP tools
//! in the turn's `ToolRegistry`.

pub mod chat_history_tail;
pub mod memory_query;
pub mod memory_store;
pub mod world_apply_ops;

pub use chat_history_tail::ChatHistoryTailTool;
pub use memory_query::MemoryQueryTool;
pub use memory_store::MemoryStoreTool;
pub use world_apply_ops::WorldApplyOpsTool;
