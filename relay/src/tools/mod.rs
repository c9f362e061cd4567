//! Tool trait, registry, MCP adapter, and the bindings nodes call into.

mod mcp_adapter;
mod registry;
mod r#trait;

pub mod bindings;

pub use mcp_adapter::{register_mcp_tools, McpToolAdapter};
pub use r#trait::{Tool, ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};
pub use registry::{ToolRegistry, ToolRegistryLocked};
