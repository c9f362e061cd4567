//! Tool registry: name -> tool lookup, shared across nodes via `Services`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::r#trait::{Tool, ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};

/// In-memory map of tool name to implementation.
///
/// Built once per turn runner from local bindings plus MCP-adapted tools
/// (see `register_mcp_tools`), then looked up by name during the tool loop.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn list(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec()).collect()
    }

    /// Specs restricted to `names`, in the order given. Used to build the
    /// provider-visible tool list after the skill firewall narrows it down.
    pub fn list_subset(&self, names: &[String]) -> Vec<ToolSpec> {
        names
            .iter()
            .filter_map(|n| self.tools.get(n).map(|t| t.spec()))
            .collect()
    }

    pub async fn call(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolSourceError::NotFound(name.to_string()))?;
        tool.call(args, ctx).await
    }
}

/// `ToolRegistry` behind an async `RwLock`, for sharing across node calls
/// within one turn.
#[derive(Default)]
pub struct ToolRegistryLocked {
    inner: RwLock<ToolRegistry>,
}

impl ToolRegistryLocked {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            inner: RwLock::new(registry),
        }
    }

    pub async fn register(&self, tool: Arc<dyn Tool>) {
        self.inner.write().await.register(tool);
    }

    pub async fn list(&self) -> Vec<ToolSpec> {
        self.inner.read().await.list()
    }

    pub async fn list_subset(&self, names: &[String]) -> Vec<ToolSpec> {
        self.inner.read().await.list_subset(names)
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.inner.read().await.contains(name)
    }

    pub async fn call(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        self.inner.read().await.call(name, args, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "echo".into(),
                description: None,
                input_schema: serde_json::json!({}),
            }
        }
        async fn call(
            &self,
            args: serde_json::Value,
            _ctx: Option<&ToolCallContext>,
        ) -> Result<ToolCallContent, ToolSourceError> {
            Ok(ToolCallContent {
                text: args.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn registry_calls_registered_tool_by_name() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(Echo));
        let out = reg.call("echo", serde_json::json!({"a":1}), None).await.unwrap();
        assert_eq!(out.text, "{\"a\":1}");
    }

    #[tokio::test]
    async fn registry_call_unknown_tool_is_not_found() {
        let reg = ToolRegistry::new();
        let err = reg.call("nope", serde_json::Value::Null, None).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::NotFound(_)));
    }

    #[test]
    fn list_subset_preserves_requested_order_and_skips_missing() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(Echo));
        let specs = reg.list_subset(&["missing".to_string(), "echo".to_string()]);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "echo");
    }
}
