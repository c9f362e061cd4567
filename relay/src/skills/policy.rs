//! Per-node skill firewall: which skills a node may draw from, intersected
//! with the operator's globally enabled skills, resolved to tool names.

use std::collections::HashSet;

use super::catalog::SKILL_CATALOG;

/// Which skills each node is allowed to draw tools from, keyed by the
/// node's firewall-policy key (distinct from its tracing `node_id`, e.g.
/// `"world_modifier"` vs `"llm.world_modifier"`). Router, Answer, and
/// Reflect Topics have no entry and so resolve to an empty toolset.
pub const NODE_ALLOWED_SKILLS: &[(&str, &[&str])] = &[
    ("context_builder", &["core_context", "mcp_memory_read"]),
    ("memory_retriever", &["mcp_memory_read"]),
    ("world_modifier", &["core_world"]),
    ("memory_writer", &["mcp_memory_write"]),
];

/// Skills enabled operator-wide; a node only ever sees the intersection of
/// this set with its own `NODE_ALLOWED_SKILLS` entry.
pub const ENABLED_SKILLS: &[&str] = &["core_context", "core_world", "mcp_memory_read", "mcp_memory_write"];

/// Tool names visible to `node_key`: union of the node's allowed skills
/// intersected with `ENABLED_SKILLS`, deduplicated.
pub fn allowed_tool_names(node_key: &str) -> Vec<String> {
    let enabled: HashSet<&str> = ENABLED_SKILLS.iter().copied().collect();
    let node_skills: HashSet<&str> = NODE_ALLOWED_SKILLS
        .iter()
        .find(|(key, _)| *key == node_key)
        .map(|(_, skills)| skills.iter().copied().collect())
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for skill in SKILL_CATALOG {
        if node_skills.contains(skill.name) && enabled.contains(skill.name) {
            for tool_name in skill.tool_names {
                if seen.insert(*tool_name) {
                    names.push(tool_name.to_string());
                }
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_retriever_only_sees_memory_read_tools() {
        let names = allowed_tool_names("memory_retriever");
        assert!(names.contains(&"memory_query".to_string()));
        assert!(!names.contains(&"world_apply_ops".to_string()));
        assert!(!names.contains(&"memory_store".to_string()));
    }

    #[test]
    fn world_modifier_sees_only_world_apply_ops() {
        let names = allowed_tool_names("world_modifier");
        assert_eq!(names, vec!["world_apply_ops".to_string()]);
    }

    #[test]
    fn context_builder_sees_history_and_memory_read_but_not_write() {
        let names = allowed_tool_names("context_builder");
        assert!(names.contains(&"chat_history_tail".to_string()));
        assert!(names.contains(&"memory_query".to_string()));
        assert!(!names.contains(&"memory_store".to_string()));
    }

    #[test]
    fn answer_and_router_see_no_tools() {
        assert!(allowed_tool_names("answer").is_empty());
        assert!(allowed_tool_names("router").is_empty());
        assert!(allowed_tool_names("reflect_topics").is_empty());
    }

    #[test]
    fn unknown_node_key_sees_no_tools() {
        assert!(allowed_tool_names("nonexistent").is_empty());
    }
}
