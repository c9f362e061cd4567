//! Shared node plumbing: render a node's prompt, resolve its tool subset
//! through the skill firewall, and run the tool loop against it.

use std::collections::HashMap;

use crate::emitter::Span;
use crate::error::EngineError;
use crate::message::Message;
use crate::prompt::render_prompt;
use crate::services::{Deps, Role};
use crate::skills::policy::allowed_tool_names;
use crate::tool_loop::{run_tool_loop, ToolLoopOutcome};
use crate::tools::ToolRegistryLocked;

/// Renders `node_key`'s template with `values`, resolves its allowed tools
/// against the skill firewall, and drives the tool loop to completion.
pub async fn run_node(
    deps: &Deps,
    tools: &ToolRegistryLocked,
    span: &Span,
    node_key: &str,
    role: Role,
    values: &HashMap<String, String>,
) -> Result<ToolLoopOutcome, EngineError> {
    let template = deps.prompts.template_for(node_key);
    let rendered = render_prompt(&template, values)?;
    let tool_names = allowed_tool_names(node_key);
    let tool_specs = tools.list_subset(&tool_names).await;
    let role_config = deps.role_config(role);

    run_tool_loop(
        deps.provider.as_ref(),
        span,
        &role_config.model,
        vec![Message::user(rendered)],
        role_config.params.clone(),
        role_config.response_format.clone(),
        tool_specs,
        tools,
        deps.tool_step_limit,
    )
    .await
}

/// Runs a node's prompt/tool-loop step and, on any failure, logs the error
/// against the span before propagating it — the node itself still owns the
/// span and is responsible for the final `end_ok`/`end_error` call.
pub async fn run_node_or_fail(
    deps: &Deps,
    tools: &ToolRegistryLocked,
    span: &Span,
    node_key: &str,
    role: Role,
    values: &HashMap<String, String>,
) -> Result<ToolLoopOutcome, EngineError> {
    match run_node(deps, tools, span, node_key, role, values).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            span.log("error", e.to_string(), node_key, serde_json::Value::Null);
            Err(e)
        }
    }
}
