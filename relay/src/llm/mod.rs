//! LLM provider abstraction: a streaming, event-based contract every node
//! that talks to a model goes through.
//!
//! Unlike a single-shot `invoke -> response` client, a provider here streams
//! `ProviderEvent`s over an `mpsc` channel as the model produces them, so
//! nodes can forward `delta_text`/`delta_thinking` straight to the turn's
//! event bus instead of buffering a whole response before emitting anything.

mod ollama;
mod scripted;

pub use ollama::OllamaProvider;
pub use scripted::ScriptedProvider;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::EngineError;
use crate::message::Message;
use crate::tools::ToolSpec;

/// Tool choice mode for chat completions: when tools are present, controls
/// whether the model may choose (auto), must not use (none), or must use (required).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolChoiceMode {
    #[default]
    Auto,
    None,
    Required,
}

impl std::str::FromStr for ToolChoiceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "none" => Ok(Self::None),
            "required" => Ok(Self::Required),
            _ => Err(format!(
                "unknown tool_choice: {} (use auto, none, or required)",
                s
            )),
        }
    }
}

/// Sampling and shaping parameters for one chat request.
#[derive(Clone, Debug, Default)]
pub struct ChatParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tool_choice: ToolChoiceMode,
}

/// Forces the model to emit a JSON object as its whole reply. Mutually
/// exclusive with a non-empty `tools` list on the same request.
#[derive(Clone, Debug)]
pub enum ResponseFormat {
    Json,
}

/// One chat-completion request.
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub params: ChatParams,
    pub response_format: Option<ResponseFormat>,
    pub tools: Vec<ToolSpec>,
}

impl ChatRequest {
    /// `response_format: Json` and a non-empty `tools` list cannot both be set;
    /// most providers reject (or silently ignore) one of the two.
    pub fn validate(&self) -> Result<(), EngineError> {
        if matches!(self.response_format, Some(ResponseFormat::Json)) && !self.tools.is_empty() {
            return Err(EngineError::ProviderError(
                "response_format=json cannot be combined with tools".to_string(),
            ));
        }
        Ok(())
    }
}

/// A tool call the model asked to make.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub name: String,
    pub arguments: String,
}

/// One increment of a streamed completion.
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderEvent {
    DeltaText(String),
    DeltaThinking(String),
    ToolCall(ToolCallRequest),
    Done,
    Error(String),
}

/// An LLM backend that streams `ProviderEvent`s for one chat request.
///
/// **Interaction**: called by nodes (Router, Answer, ...) with a fully
/// rendered `ChatRequest`; events are forwarded live to the turn's emitter.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn stream(&self, request: ChatRequest) -> Result<mpsc::Receiver<ProviderEvent>, EngineError>;
}

/// Drains a provider's event stream into its concatenated text and any tool
/// calls, for nodes that need the whole response rather than live deltas.
pub async fn collect(mut events: mpsc::Receiver<ProviderEvent>) -> Result<(String, Vec<ToolCallRequest>), EngineError> {
    let mut text = String::new();
    let mut tool_calls = Vec::new();
    while let Some(event) = events.recv().await {
        match event {
            ProviderEvent::DeltaText(chunk) => text.push_str(&chunk),
            ProviderEvent::DeltaThinking(_) => {}
            ProviderEvent::ToolCall(call) => tool_calls.push(call),
            ProviderEvent::Done => break,
            ProviderEvent::Error(message) => return Err(EngineError::ProviderError(message)),
        }
    }
    Ok((text, tool_calls))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_choice_mode_from_str_parses_known_values() {
        assert_eq!("auto".parse::<ToolChoiceMode>().unwrap(), ToolChoiceMode::Auto);
        assert_eq!("none".parse::<ToolChoiceMode>().unwrap(), ToolChoiceMode::None);
        assert_eq!(
            "required".parse::<ToolChoiceMode>().unwrap(),
            ToolChoiceMode::Required
        );
    }

    #[test]
    fn tool_choice_mode_from_str_rejects_unknown_value() {
        let err = "unexpected".parse::<ToolChoiceMode>().unwrap_err();
        assert!(err.contains("unknown tool_choice"));
    }

    #[test]
    fn validate_rejects_json_response_format_with_tools() {
        let request = ChatRequest {
            model: "m".into(),
            messages: vec![],
            params: ChatParams::default(),
            response_format: Some(ResponseFormat::Json),
            tools: vec![ToolSpec {
                name: "t".into(),
                description: None,
                input_schema: serde_json::json!({}),
            }],
        };
        assert!(request.validate().is_err());
    }

    #[tokio::test]
    async fn collect_concatenates_text_and_gathers_tool_calls() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(ProviderEvent::DeltaText("hel".into())).await.unwrap();
        tx.send(ProviderEvent::DeltaText("lo".into())).await.unwrap();
        tx.send(ProviderEvent::ToolCall(ToolCallRequest {
            call_id: "c1".into(),
            name: "world_apply_ops".into(),
            arguments: "{}".into(),
        }))
        .await
        .unwrap();
        tx.send(ProviderEvent::Done).await.unwrap();
        drop(tx);
        let (text, calls) = collect(rx).await.unwrap();
        assert_eq!(text, "hello");
        assert_eq!(calls.len(), 1);
    }

    #[tokio::test]
    async fn collect_surfaces_provider_error() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(ProviderEvent::Error("timeout".into())).await.unwrap();
        drop(tx);
        let err = collect(rx).await.unwrap_err();
        assert!(matches!(err, EngineError::ProviderError(_)));
    }
}
