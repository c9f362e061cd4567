//! Static catalog of named skills and the tool names each one bundles.

use crate::tools::bindings::chat_history_tail::TOOL_CHAT_HISTORY_TAIL;
use crate::tools::bindings::memory_query::TOOL_MEMORY_QUERY;
use crate::tools::bindings::memory_store::TOOL_MEMORY_STORE;
use crate::tools::bindings::world_apply_ops::TOOL_WORLD_APPLY_OPS;

/// One entry in the skill catalog: a name plus the tool names it grants.
pub struct Skill {
    pub name: &'static str,
    pub tool_names: &'static [&'static str],
}

/// Every skill the engine knows about, regardless of what's enabled or
/// allowed for any particular node.
pub const SKILL_CATALOG: &[Skill] = &[
    Skill {
        name: "core_context",
        tool_names: &[TOOL_CHAT_HISTORY_TAIL],
    },
    Skill {
        name: "core_world",
        tool_names: &[TOOL_WORLD_APPLY_OPS],
    },
    Skill {
        name: "mcp_memory_read",
        tool_names: &[TOOL_MEMORY_QUERY],
    },
    Skill {
        name: "mcp_memory_write",
        tool_names: &[TOOL_MEMORY_STORE],
    },
];
