//! Per-node prompt templates: embedded defaults with an optional
//! directory override, mirroring the workspace's `load`/`load_or_default`/
//! `default_from_embedded` prompt-loading shape.

use std::path::PathBuf;

macro_rules! embed_template {
    ($name:literal) => {
        include_str!(concat!("../../prompts/", $name))
    };
}

const ROUTER: &str = embed_template!("runtime_router.txt");
const CONTEXT_BUILDER: &str = embed_template!("runtime_context_builder.txt");
const MEMORY_RETRIEVER: &str = embed_template!("runtime_memory_retriever.txt");
const WORLD_MODIFIER: &str = embed_template!("runtime_world_modifier.txt");
const ANSWER: &str = embed_template!("runtime_answer.txt");
const REFLECT_TOPICS: &str = embed_template!("runtime_reflect_topics.txt");
const MEMORY_WRITER: &str = embed_template!("runtime_memory_writer.txt");

/// Node keys with an embedded default template, and the filename an
/// override directory is checked for.
const NODE_FILES: &[(&str, &str, &str)] = &[
    ("router", "runtime_router.txt", ROUTER),
    ("context_builder", "runtime_context_builder.txt", CONTEXT_BUILDER),
    ("memory_retriever", "runtime_memory_retriever.txt", MEMORY_RETRIEVER),
    ("world_modifier", "runtime_world_modifier.txt", WORLD_MODIFIER),
    ("answer", "runtime_answer.txt", ANSWER),
    ("reflect_topics", "runtime_reflect_topics.txt", REFLECT_TOPICS),
    ("memory_writer", "runtime_memory_writer.txt", MEMORY_WRITER),
];

fn default_for(node_key: &str) -> &'static str {
    NODE_FILES
        .iter()
        .find(|(key, _, _)| *key == node_key)
        .map(|(_, _, text)| *text)
        .unwrap_or_else(|| panic!("no embedded template for node key {node_key}"))
}

fn file_name_for(node_key: &str) -> &'static str {
    NODE_FILES
        .iter()
        .find(|(key, _, _)| *key == node_key)
        .map(|(_, file, _)| *file)
        .unwrap_or_else(|| panic!("no embedded template for node key {node_key}"))
}

/// Loads templates from an optional override directory, falling back to
/// embedded defaults file-by-file (a present-but-empty directory still uses
/// defaults for any file it doesn't contain).
pub struct TemplateLoader {
    override_dir: Option<PathBuf>,
}

impl TemplateLoader {
    pub fn new(override_dir: Option<impl Into<PathBuf>>) -> Self {
        Self {
            override_dir: override_dir.map(Into::into),
        }
    }

    pub fn embedded() -> Self {
        Self { override_dir: None }
    }

    /// Returns the template text for `node_key`: the override directory's
    /// file if present and readable, else the embedded default.
    pub fn template_for(&self, node_key: &str) -> String {
        if let Some(dir) = &self.override_dir {
            if let Ok(text) = std::fs::read_to_string(dir.join(file_name_for(node_key))) {
                return text;
            }
        }
        default_for(node_key).to_string()
    }
}

/// Directory override, from `PROMPTS_DIR` if set.
pub fn override_dir_from_env() -> Option<PathBuf> {
    std::env::var("PROMPTS_DIR").ok().map(PathBuf::from).filter(|p| p.is_dir())
}
