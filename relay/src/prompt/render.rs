//! Substitutes `<<TOKEN>>` placeholders in a prompt template with supplied values.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::EngineError;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<<[A-Z0-9_]+>>").expect("static token pattern is valid"))
}

/// Replaces every `<<TOKEN>>` in `template` with `values["TOKEN"]`.
///
/// Every token occurring in the template must have an entry in `values`;
/// leftover unresolved tokens raise `EngineError::PromptUnresolvedTokens`
/// naming each one (deduplicated, in first-occurrence order).
pub fn render_prompt(template: &str, values: &HashMap<String, String>) -> Result<String, EngineError> {
    let mut unresolved = Vec::new();
    let mut seen = std::collections::HashSet::new();

    let rendered = token_pattern().replace_all(template, |caps: &regex::Captures| {
        let token = &caps[0];
        let key = &token[2..token.len() - 2];
        match values.get(key) {
            Some(v) => v.clone(),
            None => {
                if seen.insert(key.to_string()) {
                    unresolved.push(key.to_string());
                }
                token.to_string()
            }
        }
    });

    if !unresolved.is_empty() {
        return Err(EngineError::PromptUnresolvedTokens(unresolved));
    }
    Ok(rendered.into_owned())
}
