//! Services/Deps wiring (C15): the long-lived bundles every node reaches
//! through, as opposed to per-turn state carried in the graph's `S`.
//!
//! `Deps` holds the provider, prompt loader, and role→LLM config; `Services`
//! holds the toolkit and resource bundle (chat-history, world-state, clock,
//! MCP, default memory owner). Neither is part of `TurnState`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::chat_history::ChatHistory;
use crate::llm::{ChatParams, LlmProvider, ResponseFormat};
use crate::mcp::McpSession;
use crate::prompt::TemplateLoader;
use crate::tools::ToolRegistryLocked;
use crate::world_state::WorldStateStore;

/// Logical LLM profile a node asks for; mapped to a concrete model/params
/// by `Deps::role_config`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Router,
    Planner,
    Reflect,
    Answer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Router => "router",
            Role::Planner => "planner",
            Role::Reflect => "reflect",
            Role::Answer => "answer",
        }
    }
}

/// Concrete binding for a `Role`: model name, sampling params, and an
/// optional forced response format.
#[derive(Clone, Debug)]
pub struct RoleConfig {
    pub model: String,
    pub params: ChatParams,
    pub response_format: Option<ResponseFormat>,
}

/// Provider, prompt loader, and per-role model bindings — the LLM-facing
/// half of node wiring. Built once at startup and shared across turns.
pub struct Deps {
    pub provider: Arc<dyn LlmProvider>,
    pub prompts: TemplateLoader,
    pub roles: HashMap<Role, RoleConfig>,
    pub tool_step_limit: usize,
}

impl Deps {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        prompts: TemplateLoader,
        roles: HashMap<Role, RoleConfig>,
        tool_step_limit: usize,
    ) -> Self {
        Self {
            provider,
            prompts,
            roles,
            tool_step_limit,
        }
    }

    /// The role binding a node asks for; panics if the deployment omitted a
    /// required role, since that is a startup-configuration bug, not a
    /// per-turn failure.
    pub fn role_config(&self, role: Role) -> &RoleConfig {
        self.roles
            .get(&role)
            .unwrap_or_else(|| panic!("no model configured for role {}", role.as_str()))
    }
}

/// Toolkit and IO-bearing resources: chat-history log, world-state store,
/// clock/timezone, optional MCP session, default memory owner, tool
/// registry. Explicitly not part of `TurnState` and not part of `Deps`.
pub struct Services {
    pub tools: Arc<ToolRegistryLocked>,
    pub chat_history: Arc<ChatHistory>,
    pub world_state: Arc<WorldStateStore>,
    /// IANA timezone name (e.g. `"UTC"`), used for prompt tokens like `<<TIMEZONE>>`.
    pub timezone: String,
    pub mcp: Option<Arc<McpSession>>,
    pub default_memory_user_id: String,
    pub chat_history_max_turns: usize,
}

impl Services {
    pub fn new(
        tools: Arc<ToolRegistryLocked>,
        chat_history_path: impl Into<PathBuf>,
        world_state_path: impl Into<PathBuf>,
        timezone: impl Into<String>,
        mcp: Option<Arc<McpSession>>,
        default_memory_user_id: impl Into<String>,
        chat_history_max_turns: usize,
    ) -> Self {
        Self {
            tools,
            chat_history: Arc::new(ChatHistory::new(chat_history_path)),
            world_state: Arc::new(WorldStateStore::new(world_state_path)),
            timezone: timezone.into(),
            mcp,
            default_memory_user_id: default_memory_user_id.into(),
            chat_history_max_turns,
        }
    }

    /// Current UTC time, stamped in events and history entries; `timezone`
    /// is surfaced separately for prompt rendering.
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now()
    }
}
