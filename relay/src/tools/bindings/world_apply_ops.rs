//! `world_apply_ops`: applies a batch of allowlisted mutations to the
//! current turn's in-memory world document.
//!
//! Disk commit is not this tool's job — the turn runner commits the world
//! to the `WorldStateStore` once at the turn boundary.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::tools::{Tool, ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};
use crate::world_state::{apply_op, WorldOp, WorldOpKind};

pub const TOOL_WORLD_APPLY_OPS: &str = "world_apply_ops";

/// Mutates a shared in-memory world document, one turn at a time.
///
/// Constructed fresh per turn over `Arc<Mutex<Value>>` seeded from the
/// turn's world-before snapshot; the node reads the mutex back into state
/// once the tool loop ends.
pub struct WorldApplyOpsTool {
    world: Arc<Mutex<serde_json::Value>>,
}

impl WorldApplyOpsTool {
    pub fn new(world: Arc<Mutex<serde_json::Value>>) -> Self {
        Self { world }
    }
}

fn parse_kind(s: &str) -> Result<WorldOpKind, ToolSourceError> {
    match s {
        "set" => Ok(WorldOpKind::Set),
        "add" => Ok(WorldOpKind::Add),
        "remove" => Ok(WorldOpKind::Remove),
        other => Err(ToolSourceError::InvalidInput(format!("unknown op: {other}"))),
    }
}

#[async_trait]
impl Tool for WorldApplyOpsTool {
    fn name(&self) -> &str {
        TOOL_WORLD_APPLY_OPS
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_WORLD_APPLY_OPS.to_string(),
            description: Some(
                "Apply one or more mutations to the world document. Allowed paths: \
                 /project, /identity/user_location, /identity/user_name, /identity/agent_name \
                 (set only), /rules, /goals (set, add, remove)."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ops": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "path": {"type": "string"},
                                "op": {"type": "string", "enum": ["set", "add", "remove"]},
                                "value": {}
                            },
                            "required": ["path", "op", "value"]
                        }
                    }
                },
                "required": ["ops"]
            }),
        }
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let ops = args
            .get("ops")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing ops array".to_string()))?;

        let mut doc = self.world.lock().unwrap().clone();
        for raw in ops {
            let path = raw
                .get("path")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ToolSourceError::InvalidInput("op missing path".to_string()))?
                .to_string();
            let kind = raw
                .get("op")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ToolSourceError::InvalidInput("op missing op".to_string()))
                .and_then(parse_kind)?;
            let value = raw.get("value").cloned().unwrap_or(serde_json::Value::Null);
            doc = apply_op(&doc, &WorldOp { path, kind, value }).map_err(|e| ToolSourceError::InvalidInput(e.to_string()))?;
        }
        *self.world.lock().unwrap() = doc.clone();

        let body = json!({"ok": true, "world": doc});
        Ok(ToolCallContent {
            text: body.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world_state::default_world;

    #[tokio::test]
    async fn applies_set_and_add_ops_in_order() {
        let world = Arc::new(Mutex::new(default_world()));
        let tool = WorldApplyOpsTool::new(Arc::clone(&world));
        let args = json!({
            "ops": [
                {"path": "/project", "op": "set", "value": "relay"},
                {"path": "/rules", "op": "add", "value": "be terse"}
            ]
        });
        let out = tool.call(args, None).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out.text).unwrap();
        assert_eq!(parsed["ok"], true);
        assert_eq!(parsed["world"]["project"], "relay");
        let doc = world.lock().unwrap().clone();
        assert_eq!(doc["project"], "relay");
        assert_eq!(doc["rules"], json!(["be terse"]));
    }

    #[tokio::test]
    async fn invalid_op_rejects_whole_batch_and_leaves_world_untouched() {
        let world = Arc::new(Mutex::new(default_world()));
        let tool = WorldApplyOpsTool::new(Arc::clone(&world));
        let before = world.lock().unwrap().clone();
        let args = json!({"ops": [{"path": "/project", "op": "add", "value": "x"}]});
        let err = tool.call(args, None).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::InvalidInput(_)));
        assert_eq!(*world.lock().unwrap(), before);
    }
}
