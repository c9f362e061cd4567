//! Skill catalog and the node-level firewall that decides which tools a
//! node's LLM call is allowed to see.
//!
//! A "skill" names a bundle of tool names (e.g. the `core_context` skill
//! bundles `chat_history_tail` and `world_apply_ops`). `NODE_ALLOWED_SKILLS`
//! says which skills each node may draw from; `ENABLED_SKILLS` is the
//! operator's global allowlist. The tool names visible to a node are the
//! union of its allowed skills intersected with the enabled set, resolved
//! against the tool registry.

mod catalog;
mod policy;

pub use catalog::{Skill, SKILL_CATALOG};
pub use policy::{allowed_tool_names, ENABLED_SKILLS, NODE_ALLOWED_SKILLS};
