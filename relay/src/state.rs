//! Per-turn state threaded through the compiled graph: the `task` the user
//! asked for, `runtime` bookkeeping, the `context` aggregate built on the
//! way to answering, the `final` answer, and the `world` document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::emitter::Emitter;

/// Maximum number of `runtime.issues` entries kept per turn; oldest dropped
/// first so a pathological loop can't grow state unboundedly.
pub const MAX_ISSUES: usize = 50;

#[derive(Clone, Debug)]
pub struct TurnState {
    pub task: Task,
    pub runtime: Runtime,
    pub context: Context,
    pub final_: Final,
    pub world: World,
    /// Installed by the turn runner before the graph is invoked; every node
    /// opens its span through this handle.
    pub emitter: Emitter,
}

#[derive(Clone, Debug)]
pub struct Task {
    pub user_text: String,
    pub language: String,
    pub route: Option<String>,
    pub memory_request: Option<MemoryRequest>,
}

#[derive(Clone, Debug)]
pub struct MemoryRequest {
    pub k: usize,
}

#[derive(Clone, Debug)]
pub struct Runtime {
    pub turn_id: String,
    pub node_trace: Vec<String>,
    pub status: String,
    pub issues: Vec<String>,
    pub now_iso: String,
    pub timezone: String,
}

impl Runtime {
    pub fn push_issue(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
        if self.issues.len() > MAX_ISSUES {
            let overflow = self.issues.len() - MAX_ISSUES;
            self.issues.drain(0..overflow);
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Context {
    pub sources: Vec<Source>,
    pub issues: Vec<String>,
    pub want_history: bool,
    pub status: Option<String>,
}

/// One aggregated piece of context surfaced to the Answer node, tagged by
/// `kind` (`"history"`, `"memories"`, `"notes"`, ...).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Source {
    pub kind: String,
    pub title: String,
    pub items: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Clone, Debug, Default)]
pub struct Final {
    pub answer: String,
}

/// The persistent world document, typed for the keys the engine knows
/// about; any other key round-trips unchanged through `extra`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct World {
    pub updated_at: String,
    pub tz: String,
    pub project: String,
    pub topics: Vec<String>,
    pub goals: Vec<String>,
    pub rules: Vec<String>,
    pub identity: Identity,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl World {
    /// Deserializes a loaded/committed JSON document into the typed shape,
    /// preserving any keys this engine doesn't recognize in `extra`.
    pub fn from_value(value: Value) -> Result<World, crate::error::EngineError> {
        serde_json::from_value(value).map_err(crate::error::EngineError::from)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub session_user_name: String,
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub user_location: String,
}

impl TurnState {
    /// Builds fresh turn state with a throwaway emitter wired to a bus of its
    /// own; the runner overwrites `emitter` with the turn's real one (backed
    /// by the bus it hands to the consumer) before invoking the graph.
    pub fn new(turn_id: impl Into<String>, user_text: impl Into<String>, world: World, now_iso: impl Into<String>, timezone: impl Into<String>) -> Self {
        let turn_id = turn_id.into();
        let timezone = timezone.into();
        Self {
            task: Task {
                user_text: user_text.into(),
                language: "en".to_string(),
                route: None,
                memory_request: None,
            },
            runtime: Runtime {
                turn_id: turn_id.clone(),
                node_trace: Vec::new(),
                status: String::new(),
                issues: Vec::new(),
                now_iso: now_iso.into(),
                timezone,
            },
            context: Context::default(),
            final_: Final::default(),
            world,
            emitter: Emitter::new(crate::event::EventBus::new(turn_id)),
        }
    }

    /// Keys present in `world` (post-invoke) whose value differs from (or is
    /// absent from) `world_before` — the asymmetric delta the runner commits
    /// and emits at turn end. A key removed entirely from `world` is not
    /// reported, matching the on-disk document, which always holds the
    /// current full state.
    pub fn world_delta(&self, world_before: &Value) -> Value {
        let after = self.world.to_value();
        let mut delta = serde_json::Map::new();
        if let (Some(after), Some(before)) = (after.as_object(), world_before.as_object()) {
            for (key, after_value) in after {
                if before.get(key) != Some(after_value) {
                    delta.insert(key.clone(), after_value.clone());
                }
            }
        }
        Value::Object(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world_state::default_world as default_world_json;
    use serde_json::json;

    fn default_world() -> World {
        World::from_value(default_world_json()).unwrap()
    }

    fn state_with_world(world: World) -> TurnState {
        TurnState::new("t1", "hi", world, "2026-07-28T00:00:00Z", "UTC")
    }

    #[test]
    fn world_delta_reports_only_changed_keys_present_after() {
        let world_before = default_world_json();
        let mut world = default_world();
        world.project = "atlas".to_string();
        let state = state_with_world(world);
        let delta = state.world_delta(&world_before);
        assert_eq!(delta["project"], json!("atlas"));
        assert!(delta.get("rules").is_none());
    }

    #[test]
    fn world_delta_is_empty_when_nothing_changed() {
        let world = default_world();
        let world_before = world.to_value();
        let state = state_with_world(world);
        assert_eq!(state.world_delta(&world_before), json!({}));
    }

    #[test]
    fn push_issue_drops_oldest_past_the_cap() {
        let mut runtime = Runtime {
            turn_id: "t1".into(),
            node_trace: Vec::new(),
            status: String::new(),
            issues: Vec::new(),
            now_iso: "2026-07-28T00:00:00Z".into(),
            timezone: "UTC".into(),
        };
        for i in 0..(MAX_ISSUES + 5) {
            runtime.push_issue(format!("issue-{i}"));
        }
        assert_eq!(runtime.issues.len(), MAX_ISSUES);
        assert_eq!(runtime.issues.first().unwrap(), "issue-5");
    }
}
