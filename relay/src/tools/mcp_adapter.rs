//! MCP tool adapter: wraps each remote MCP tool as `dyn Tool` for the registry.

use std::sync::Arc;

use async_trait::async_trait;

use crate::mcp::McpSession;

use super::r#trait::{Tool, ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};
use super::registry::ToolRegistry;

/// Makes one remote MCP tool implement the `Tool` trait; `call` delegates to
/// `tools/call` over the shared session.
pub struct McpToolAdapter {
    name: String,
    spec: ToolSpec,
    session: Arc<McpSession>,
}

impl McpToolAdapter {
    pub fn new(name: String, spec: ToolSpec, session: Arc<McpSession>) -> Self {
        Self { name, spec, session }
    }
}

#[async_trait]
impl Tool for McpToolAdapter {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn spec(&self) -> ToolSpec {
        self.spec.clone()
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        self.session
            .tools_call(self.name.as_str(), args)
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))
    }
}

/// Lists tools on `session` and registers one adapter per tool into `registry`.
pub async fn register_mcp_tools(
    registry: &mut ToolRegistry,
    session: Arc<McpSession>,
) -> Result<(), ToolSourceError> {
    let specs = session
        .tools_list()
        .await
        .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
    for spec in specs {
        let adapter = McpToolAdapter::new(spec.name.clone(), spec, Arc::clone(&session));
        registry.register(Arc::new(adapter));
    }
    Ok(())
}
