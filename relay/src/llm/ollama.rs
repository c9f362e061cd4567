//! Ollama HTTP provider: streams newline-delimited JSON chunks from
//! `/api/chat` and turns each into a `ProviderEvent`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::error::EngineError;
use crate::message::Message;

use super::{ChatRequest, LlmProvider, ProviderEvent, ResponseFormat, ToolCallRequest};

/// Talks to a local (or remote) Ollama server's `/api/chat` endpoint.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Deserialize)]
struct OllamaChunk {
    message: Option<OllamaMessage>,
    done: bool,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: Option<String>,
    thinking: Option<String>,
    tool_calls: Option<Vec<OllamaToolCall>>,
}

#[derive(Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

#[derive(Deserialize)]
struct OllamaFunction {
    name: String,
    arguments: serde_json::Value,
}

fn to_wire_message(message: &Message) -> serde_json::Value {
    match message {
        Message::System { content } => json!({"role": "system", "content": content}),
        Message::User { content } => json!({"role": "user", "content": content}),
        Message::Assistant { content } => json!({"role": "assistant", "content": content}),
        Message::Tool { content, .. } => json!({"role": "tool", "content": content}),
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn stream(&self, request: ChatRequest) -> Result<mpsc::Receiver<ProviderEvent>, EngineError> {
        request.validate()?;

        let mut body = json!({
            "model": request.model,
            "messages": request.messages.iter().map(to_wire_message).collect::<Vec<_>>(),
            "stream": true,
            "options": {
                "temperature": request.params.temperature,
            },
        });
        if let Some(max_tokens) = request.params.max_tokens {
            body["options"]["num_predict"] = json!(max_tokens);
        }
        if matches!(request.response_format, Some(ResponseFormat::Json)) {
            body["format"] = json!("json");
        }
        if !request.tools.is_empty() {
            body["tools"] = json!(request
                .tools
                .iter()
                .map(|t| json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.input_schema,
                    }
                }))
                .collect::<Vec<_>>());
        }

        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::ProviderError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::ProviderError(format!(
                "ollama returned status {}",
                response.status()
            )));
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buf = String::new();
            loop {
                use tokio_stream::StreamExt;
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        buf.push_str(&String::from_utf8_lossy(&bytes));
                        while let Some(pos) = buf.find('\n') {
                            let line = buf[..pos].to_string();
                            buf = buf[pos + 1..].to_string();
                            if line.trim().is_empty() {
                                continue;
                            }
                            if !forward_line(&line, &tx).await {
                                return;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        let _ = tx.send(ProviderEvent::Error(e.to_string())).await;
                        return;
                    }
                    None => break,
                }
            }
            if !buf.trim().is_empty() {
                forward_line(&buf, &tx).await;
            }
            let _ = tx.send(ProviderEvent::Done).await;
        });

        Ok(rx)
    }
}

/// Parses one NDJSON line into events, forwarding them on `tx`.
/// Returns `false` if `done: true` was seen (caller should stop reading).
async fn forward_line(line: &str, tx: &mpsc::Sender<ProviderEvent>) -> bool {
    let chunk: OllamaChunk = match serde_json::from_str(line) {
        Ok(c) => c,
        Err(e) => {
            let _ = tx.send(ProviderEvent::Error(format!("malformed chunk: {e}"))).await;
            return false;
        }
    };
    if let Some(message) = chunk.message {
        if let Some(thinking) = message.thinking {
            if !thinking.is_empty() {
                let _ = tx.send(ProviderEvent::DeltaThinking(thinking)).await;
            }
        }
        if let Some(content) = message.content {
            if !content.is_empty() {
                let _ = tx.send(ProviderEvent::DeltaText(content)).await;
            }
        }
        if let Some(calls) = message.tool_calls {
            for (i, call) in calls.into_iter().enumerate() {
                let _ = tx
                    .send(ProviderEvent::ToolCall(ToolCallRequest {
                        call_id: format!("call_{i}"),
                        name: call.function.name,
                        arguments: call.function.arguments.to_string(),
                    }))
                    .await;
            }
        }
    }
    !chunk.done
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forward_line_emits_text_and_stops_on_done() {
        let (tx, mut rx) = mpsc::channel(4);
        let more = forward_line(
            r#"{"message":{"content":"hi"},"done":false}"#,
            &tx,
        )
        .await;
        assert!(more);
        assert_eq!(rx.recv().await, Some(ProviderEvent::DeltaText("hi".into())));

        let more = forward_line(r#"{"message":{"content":""},"done":true}"#, &tx).await;
        assert!(!more);
    }
}
