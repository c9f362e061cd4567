//! MCP streamable-HTTP JSON-RPC client: initialize handshake, `tools/list`,
//! `tools/call`.
//!
//! Grounded on the streamable-HTTP transport: a session id captured from the
//! `initialize` response's `MCP-Session-Id` header is replayed on every
//! subsequent request; responses are either a single JSON body or an
//! `text/event-stream` framed body, and both are accepted.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::EngineError;
use crate::tools::{ToolCallContent, ToolSpec};

const MCP_PROTOCOL_VERSION: &str = "2025-11-25";
const INITIALIZE_REQUEST_ID: &str = "relay-mcp-initialize";
const SESSION_ID_HEADER: &str = "MCP-Session-Id";

#[derive(Serialize)]
struct RequestMessage<'a> {
    jsonrpc: &'static str,
    id: &'a str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl<'a> RequestMessage<'a> {
    fn new(id: &'a str, method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Serialize)]
struct NotificationMessage<'a> {
    jsonrpc: &'static str,
    method: &'a str,
}

#[derive(Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    result: Option<Value>,
    error: Option<ErrorObject>,
}

/// A JSON-RPC streamable-HTTP session against one MCP server.
///
/// Created once per turn runner (or once per process, if the server allows
/// it) via [`McpSession::connect`]; reused for every `tools/call`.
pub struct McpSession {
    client: reqwest::Client,
    url: String,
    headers: Vec<(String, String)>,
    session_id: Mutex<Option<String>>,
}

impl McpSession {
    /// Performs the `initialize` handshake and sends `notifications/initialized`.
    pub async fn connect(
        url: impl Into<String>,
        headers: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| EngineError::McpError(format!("build client: {e}")))?;
        let session = Self {
            client,
            url: url.into(),
            headers: headers.into_iter().collect(),
            session_id: Mutex::new(None),
        };
        session.initialize().await?;
        Ok(session)
    }

    async fn initialize(&self) -> Result<(), EngineError> {
        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "clientInfo": {"name": "relay-mcp", "version": env!("CARGO_PKG_VERSION")},
        });
        let msg = RequestMessage::new(INITIALIZE_REQUEST_ID, "initialize", Some(params));
        let resp = self.post(&msg).await?;
        if let Some(id) = resp
            .headers
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock().unwrap() = Some(id.to_string());
        }
        if resp.status == 202 {
            return self.notify_initialized().await;
        }
        parse_rpc_body(&resp)?;
        self.notify_initialized().await
    }

    async fn notify_initialized(&self) -> Result<(), EngineError> {
        let notification = NotificationMessage {
            jsonrpc: "2.0",
            method: "notifications/initialized",
        };
        let mut req = self.client.post(&self.url).json(&notification);
        req = self.apply_headers(req);
        req.send()
            .await
            .map_err(|e| EngineError::McpError(format!("notifications/initialized: {e}")))?;
        Ok(())
    }

    /// Lists tools advertised by the server.
    pub async fn tools_list(&self) -> Result<Vec<ToolSpec>, EngineError> {
        let params = json!({});
        let msg = RequestMessage::new("relay-tools-list", "tools/list", Some(params));
        let result = self.request(&msg).await?;
        let tools = result
            .get("tools")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        tools
            .into_iter()
            .map(|t| {
                let name = t
                    .get("name")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| EngineError::McpError("tool missing name".into()))?
                    .to_string();
                let description = t
                    .get("description")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                let input_schema = t
                    .get("inputSchema")
                    .cloned()
                    .unwrap_or_else(|| json!({"type": "object"}));
                Ok(ToolSpec {
                    name,
                    description,
                    input_schema,
                })
            })
            .collect()
    }

    /// Calls one tool by name, returning its first text content block.
    pub async fn tools_call(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, EngineError> {
        let params = json!({"name": name, "arguments": arguments});
        let id = format!("relay-call-{name}");
        let msg = RequestMessage::new(&id, "tools/call", Some(params));
        let result = self.request(&msg).await?;
        let text = result
            .get("content")
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .and_then(|c| c.get("text"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(ToolCallContent { text })
    }

    async fn request(&self, msg: &RequestMessage<'_>) -> Result<Value, EngineError> {
        let resp = self.post(msg).await?;
        if !(200..300).contains(&resp.status) {
            return Err(EngineError::McpError(format!(
                "http status {}: {}",
                resp.status, resp.body
            )));
        }
        parse_rpc_body(&resp)
    }

    async fn post(&self, msg: &RequestMessage<'_>) -> Result<RawResponse, EngineError> {
        let mut req = self.client.post(&self.url).json(msg);
        req = self.apply_headers(req);
        let resp = req
            .send()
            .await
            .map_err(|e| EngineError::McpError(format!("{}: {e}", msg.method)))?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let headers = resp.headers().clone();
        let body = resp
            .text()
            .await
            .map_err(|e| EngineError::McpError(format!("read body: {e}")))?;
        Ok(RawResponse {
            status,
            content_type,
            headers,
            body,
        })
    }

    fn apply_headers(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req = req.header("Accept", "application/json, text/event-stream");
        for (k, v) in &self.headers {
            req = req.header(k, v);
        }
        if let Some(id) = self.session_id.lock().unwrap().clone() {
            req = req.header(SESSION_ID_HEADER, id);
        }
        req
    }
}

struct RawResponse {
    status: u16,
    content_type: String,
    headers: reqwest::header::HeaderMap,
    body: String,
}

/// Parses a response body as either a plain JSON-RPC object or an SSE-framed
/// one (`data: <json>` lines, blank-line terminated), and converts a JSON-RPC
/// error object into `EngineError::McpError`.
fn parse_rpc_body(resp: &RawResponse) -> Result<Value, EngineError> {
    if resp.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    let json_text = if resp.content_type.contains("text/event-stream") {
        extract_sse_data(&resp.body)
    } else {
        resp.body.clone()
    };
    let msg: ResponseMessage = serde_json::from_str(&json_text)
        .map_err(|e| EngineError::McpError(format!("invalid json-rpc response: {e}")))?;
    if let Some(err) = msg.error {
        return Err(EngineError::McpError(format!(
            "rpc error {}: {}",
            err.code, err.message
        )));
    }
    Ok(msg.result.unwrap_or(Value::Null))
}

/// Takes the last non-empty `data: ` line's payload from an SSE stream body.
fn extract_sse_data(body: &str) -> String {
    let mut last = String::new();
    for line in body.lines() {
        if let Some(data) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) {
            last = data.trim().to_string();
        }
    }
    if last.is_empty() {
        body.to_string()
    } else {
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_sse_data_takes_last_data_line() {
        let body = "event: message\ndata: {\"a\":1}\n\ndata: {\"a\":2}\n";
        assert_eq!(extract_sse_data(body), "{\"a\":2}");
    }

    #[test]
    fn extract_sse_data_falls_back_to_raw_body_when_no_data_line() {
        let body = "{\"a\":1}";
        assert_eq!(extract_sse_data(body), body);
    }
}
