//! Reflect Topics (`llm.reflect_topics`): distills up to five topics from the
//! turn, forcing JSON output from the model since there is no free text to
//! show the user here.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::graph::{Next, Node};
use crate::json_extract::extract_first_json_object;
use crate::llm::{ChatRequest, ResponseFormat};
use crate::message::Message;
use crate::prompt::render_prompt;
use crate::services::{Deps, Role, Services};
use crate::state::TurnState;
use crate::tool_loop::run_tool_loop;

pub const NODE_ID: &str = "llm.reflect_topics";
const NODE_KEY: &str = "reflect_topics";
const MAX_TOPICS: usize = 5;

pub struct ReflectTopicsNode {
    deps: Arc<Deps>,
    services: Arc<Services>,
}

impl ReflectTopicsNode {
    pub fn new(deps: Arc<Deps>, services: Arc<Services>) -> Self {
        Self { deps, services }
    }
}

#[async_trait]
impl Node<TurnState> for ReflectTopicsNode {
    fn id(&self) -> &str {
        NODE_ID
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), EngineError> {
        let span = state.emitter.span(NODE_ID, "Reflect Topics");

        let mut values = HashMap::new();
        values.insert("USER_MESSAGE".to_string(), state.task.user_text.clone());
        values.insert("ANSWER_TEXT".to_string(), state.final_.answer.clone());

        let template = self.deps.prompts.template_for(NODE_KEY);
        let rendered = match render_prompt(&template, &values) {
            Ok(text) => text,
            Err(e) => {
                span.end_error(e.code(), e.to_string(), None);
                return Err(e);
            }
        };

        let role_config = self.deps.role_config(Role::Reflect);
        let outcome = match run_tool_loop(
            self.deps.provider.as_ref(),
            &span,
            &role_config.model,
            vec![Message::user(rendered)],
            role_config.params.clone(),
            Some(ResponseFormat::Json),
            vec![],
            self.services.tools.as_ref(),
            self.deps.tool_step_limit,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                span.end_error(e.code(), e.to_string(), None);
                return Err(e);
            }
        };

        let parsed = match extract_first_json_object(&outcome.text) {
            Ok(v) => v,
            Err(e) => {
                span.end_error(e.code(), e.to_string(), None);
                return Err(e);
            }
        };

        let raw_topics = parsed
            .get("topics")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut seen = std::collections::HashSet::new();
        let mut topics = Vec::new();
        for value in raw_topics {
            let Some(topic) = value.as_str() else { continue };
            let topic = topic.trim();
            if topic.is_empty() {
                continue;
            }
            if !seen.insert(topic.to_lowercase()) {
                continue;
            }
            topics.push(topic.to_string());
            if topics.len() >= MAX_TOPICS {
                break;
            }
        }

        state.world.topics = topics;
        state.runtime.node_trace.push(NODE_ID.to_string());
        span.end_ok();
        Ok((state, Next::Continue))
    }
}

#[cfg(test)]
mod tests {
    fn dedupe_case_insensitive(input: Vec<&str>) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for topic in input {
            if !seen.insert(topic.to_lowercase()) {
                continue;
            }
            out.push(topic.to_string());
        }
        out
    }

    #[test]
    fn dedupes_case_insensitively_preserving_first_occurrence_order() {
        let out = dedupe_case_insensitive(vec!["Rust", "cooking", "rust", "Cooking", "hiking"]);
        assert_eq!(out, vec!["Rust", "cooking", "hiking"]);
    }
}
