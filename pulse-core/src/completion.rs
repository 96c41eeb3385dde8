//! Chat completion proxy — streams a hosted language model's response.
//!
//! Speaks the Azure OpenAI chat-completions wire format: a role-tagged
//! message list is POSTed with `stream: true` and the reply arrives as SSE
//! `data:` frames terminated by `data: [DONE]`. One callable tool is
//! exposed: `create_document(title)` creates a document via the document
//! service and returns its edit URL; after a tool round the conversation is
//! continued for one more completion (two steps total).
//!
//! Stream failures mid-response are logged and end the stream silently;
//! nothing is retried.

use bytes::BytesMut;
use futures::channel::mpsc;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::config::ChatConfig;

/// Name of the single callable tool.
pub const CREATE_DOCUMENT_TOOL: &str = "create_document";

// ============================================================================
// Message types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFunction {
    pub name: String,
    /// JSON-encoded argument object.
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(ChatRole::Assistant, content)
    }

    fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Missing API key")]
    MissingApiKey,

    #[error("Invalid stream frame: {0}")]
    InvalidFrame(String),

    #[error("Tool call failed: {0}")]
    Tool(String),
}

// ============================================================================
// Document tool client
// ============================================================================

/// Creates external documents through the document-service HTTP API.
#[derive(Debug, Clone)]
pub struct DocumentClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDocumentResponse {
    document_id: Option<String>,
}

impl DocumentClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Create a document with the given title and return its edit URL.
    pub async fn create_document(&self, title: &str) -> Result<String, CompletionError> {
        let url = format!("{}/documents", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "title": title }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CompletionError::Api {
                code: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        let body: CreateDocumentResponse = resp.json().await?;
        let document_id = body
            .document_id
            .ok_or_else(|| CompletionError::Tool("no documentId returned".to_string()))?;
        Ok(format!(
            "https://docs.google.com/document/d/{}/edit",
            document_id
        ))
    }
}

// ============================================================================
// Streaming wire structs (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    index: usize,
    id: Option<String>,
    function: Option<ToolFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct ToolFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateDocumentArgs {
    title: String,
}

/// One parsed SSE frame.
#[derive(Debug, PartialEq)]
enum SseEvent {
    Data(String),
    Done,
}

/// Parse one line of an SSE body. Comments, blank lines, and non-data
/// fields yield `None`.
fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let line = line.trim_end_matches('\r');
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload == "[DONE]" {
        Some(SseEvent::Done)
    } else if payload.is_empty() {
        None
    } else {
        Some(SseEvent::Data(payload.to_string()))
    }
}

/// Outcome of one completion round.
enum StepOutcome {
    /// The model finished with plain text.
    Done,
    /// The model requested tool calls.
    ToolCalls(Vec<ToolCall>),
}

// ============================================================================
// ChatClient
// ============================================================================

/// Azure OpenAI chat-completions client.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
    deployment: String,
    api_version: String,
    api_key: String,
    system_prompt: String,
    max_steps: u32,
    docs: DocumentClient,
}

impl ChatClient {
    /// Build a client from config; the key comes from `AZURE_API_KEY` when
    /// not passed explicitly.
    pub fn new(config: &ChatConfig, api_key: Option<String>) -> Result<Self, CompletionError> {
        let api_key = api_key
            .or_else(|| std::env::var("AZURE_API_KEY").ok())
            .unwrap_or_default();
        if api_key.is_empty() {
            return Err(CompletionError::MissingApiKey);
        }

        let endpoint = config.endpoint.clone().unwrap_or_else(|| {
            format!("https://{}.openai.azure.com", config.resource_name)
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            deployment: config.deployment.clone(),
            api_version: config.api_version.clone(),
            api_key,
            system_prompt: config.system_prompt.clone(),
            max_steps: config.max_steps.max(1),
            docs: DocumentClient::new(config.docs_base_url.clone())?,
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    fn tool_definitions() -> serde_json::Value {
        json!([{
            "type": "function",
            "function": {
                "name": CREATE_DOCUMENT_TOOL,
                "description": "Create a new document",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "title": {
                            "type": "string",
                            "description": "The title of the document to create"
                        }
                    },
                    "required": ["title"]
                }
            }
        }])
    }

    /// Stream a conversation. Text deltas arrive on the returned receiver as
    /// they are produced; tool rounds are resolved internally. The stream
    /// ends when the model finishes or on the first error (logged, per the
    /// fail-silently contract of the completion stream).
    pub fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
    ) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded();
        let client = self.clone();

        tokio::spawn(async move {
            let mut conversation = Vec::with_capacity(messages.len() + 1);
            conversation.push(ChatMessage::system(client.system_prompt.clone()));
            conversation.extend(messages);

            for step in 0..client.max_steps {
                match client.stream_once(&conversation, &tx).await {
                    Ok(StepOutcome::Done) => return,
                    Ok(StepOutcome::ToolCalls(calls)) => {
                        tracing::debug!(step, calls = calls.len(), "Resolving tool calls");
                        if let Err(e) = client.resolve_tool_calls(&mut conversation, calls).await {
                            tracing::error!("Tool call failed: {}", e);
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Completion stream error: {}", e);
                        return;
                    }
                }
            }
            tracing::warn!("Completion ended after {} steps", client.max_steps);
        });

        rx
    }

    /// Run one completion round, forwarding text deltas and accumulating
    /// tool-call fragments.
    async fn stream_once(
        &self,
        messages: &[ChatMessage],
        tx: &mpsc::UnboundedSender<String>,
    ) -> Result<StepOutcome, CompletionError> {
        let body = json!({
            "messages": messages,
            "stream": true,
            "tools": Self::tool_definitions(),
        });

        let resp = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CompletionError::Api {
                code: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        // Tool-call fragments keyed by choice index; arguments arrive in
        // pieces across frames.
        let mut pending_calls: BTreeMap<usize, ToolCall> = BTreeMap::new();
        let mut finish_reason: Option<String> = None;

        let mut buf = BytesMut::new();
        let mut stream = resp.bytes_stream();
        'read: while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line = buf.split_to(pos + 1);
                let line = String::from_utf8_lossy(&line[..pos]);
                match parse_sse_line(&line) {
                    Some(SseEvent::Done) => break 'read,
                    Some(SseEvent::Data(payload)) => {
                        let chunk: StreamChunk = serde_json::from_str(&payload)
                            .map_err(|e| CompletionError::InvalidFrame(e.to_string()))?;
                        for choice in chunk.choices {
                            if let Some(text) = choice.delta.content {
                                if !text.is_empty() {
                                    let _ = tx.unbounded_send(text);
                                }
                            }
                            for delta in choice.delta.tool_calls.unwrap_or_default() {
                                let call =
                                    pending_calls.entry(delta.index).or_insert_with(|| ToolCall {
                                        id: String::new(),
                                        kind: "function".to_string(),
                                        function: ToolFunction {
                                            name: String::new(),
                                            arguments: String::new(),
                                        },
                                    });
                                if let Some(id) = delta.id {
                                    call.id = id;
                                }
                                if let Some(function) = delta.function {
                                    if let Some(name) = function.name {
                                        call.function.name = name;
                                    }
                                    if let Some(arguments) = function.arguments {
                                        call.function.arguments.push_str(&arguments);
                                    }
                                }
                            }
                            if choice.finish_reason.is_some() {
                                finish_reason = choice.finish_reason;
                            }
                        }
                    }
                    None => {}
                }
            }
        }

        if finish_reason.as_deref() == Some("tool_calls") && !pending_calls.is_empty() {
            Ok(StepOutcome::ToolCalls(pending_calls.into_values().collect()))
        } else {
            Ok(StepOutcome::Done)
        }
    }

    /// Execute each requested tool and append the assistant/tool message
    /// pair so the next round sees the results.
    async fn resolve_tool_calls(
        &self,
        conversation: &mut Vec<ChatMessage>,
        calls: Vec<ToolCall>,
    ) -> Result<(), CompletionError> {
        conversation.push(ChatMessage {
            role: ChatRole::Assistant,
            content: None,
            tool_calls: Some(calls.clone()),
            tool_call_id: None,
        });

        for call in calls {
            let result = self.execute_tool(&call).await?;
            conversation.push(ChatMessage {
                role: ChatRole::Tool,
                content: Some(result.to_string()),
                tool_calls: None,
                tool_call_id: Some(call.id),
            });
        }
        Ok(())
    }

    async fn execute_tool(&self, call: &ToolCall) -> Result<serde_json::Value, CompletionError> {
        match call.function.name.as_str() {
            CREATE_DOCUMENT_TOOL => {
                let args: CreateDocumentArgs = serde_json::from_str(&call.function.arguments)
                    .map_err(|e| {
                        CompletionError::Tool(format!("bad create_document arguments: {}", e))
                    })?;
                let url = self.docs.create_document(&args.title).await?;
                Ok(json!({ "url": url, "type": "text/plain" }))
            }
            other => Err(CompletionError::Tool(format!("unknown tool: {}", other))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChatConfig;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(endpoint: &str, docs_base_url: &str) -> ChatConfig {
        ChatConfig {
            resource_name: "test".to_string(),
            deployment: "gpt-4o-mini".to_string(),
            api_version: "2024-06-01".to_string(),
            endpoint: Some(endpoint.to_string()),
            system_prompt: "You are a helpful assistant.".to_string(),
            max_steps: 2,
            docs_base_url: docs_base_url.to_string(),
        }
    }

    fn sse_body(frames: &[&str]) -> String {
        let mut body = String::new();
        for frame in frames {
            body.push_str("data: ");
            body.push_str(frame);
            body.push_str("\n\n");
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    #[test]
    fn parse_sse_line_extracts_data_payload() {
        assert_eq!(
            parse_sse_line("data: {\"x\":1}"),
            Some(SseEvent::Data("{\"x\":1}".to_string()))
        );
        assert_eq!(parse_sse_line("data: [DONE]"), Some(SseEvent::Done));
        assert_eq!(parse_sse_line(""), None);
        assert_eq!(parse_sse_line(": keep-alive"), None);
        assert_eq!(parse_sse_line("event: ping"), None);
    }

    #[test]
    fn parse_sse_line_tolerates_crlf() {
        assert_eq!(parse_sse_line("data: [DONE]\r"), Some(SseEvent::Done));
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let config = test_config("http://localhost:1", "http://localhost:1");
        let err = ChatClient::new(&config, Some(String::new())).unwrap_err();
        assert!(matches!(err, CompletionError::MissingApiKey));
    }

    #[tokio::test]
    async fn streams_text_deltas_in_order() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            r#"{"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#,
            r#"{"choices":[{"delta":{"content":" world"},"finish_reason":null}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        ]);
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4o-mini/chat/completions"))
            .and(header("api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), &server.uri());
        let client = ChatClient::new(&config, Some("test-key".to_string())).unwrap();
        let rx = client.stream_chat(vec![ChatMessage::user("hi")]);
        let parts: Vec<String> = rx.collect().await;
        assert_eq!(parts.join(""), "Hello world");
    }

    #[tokio::test]
    async fn upstream_error_ends_stream_silently() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), &server.uri());
        let client = ChatClient::new(&config, Some("test-key".to_string())).unwrap();
        let rx = client.stream_chat(vec![ChatMessage::user("hi")]);
        let parts: Vec<String> = rx.collect().await;
        assert!(parts.is_empty());
    }

    #[tokio::test]
    async fn tool_call_round_creates_document_and_continues() {
        let server = MockServer::start().await;

        // Round 1: the model asks for create_document with arguments split
        // across two frames.
        let round1 = sse_body(&[
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"create_document","arguments":"{\"title\":"}}]},"finish_reason":null}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"Report\"}"}}]},"finish_reason":null}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
        ]);
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4o-mini/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(round1, "text/event-stream"))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        // The document service returns the new document id.
        Mock::given(method("POST"))
            .and(path("/documents"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "documentId": "abc123"
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        // Round 2: the model answers with the URL.
        let round2 = sse_body(&[
            r#"{"choices":[{"delta":{"content":"Created: https://docs.google.com/document/d/abc123/edit"},"finish_reason":null}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        ]);
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4o-mini/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(round2, "text/event-stream"))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), &server.uri());
        let client = ChatClient::new(&config, Some("test-key".to_string())).unwrap();
        let rx = client.stream_chat(vec![ChatMessage::user("make me a report doc")]);
        let text: String = rx.collect::<Vec<String>>().await.join("");
        assert!(text.contains("abc123"));
    }

    #[tokio::test]
    async fn document_client_builds_edit_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/documents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "documentId": "d0c"
            })))
            .mount(&server)
            .await;

        let docs = DocumentClient::new(server.uri()).unwrap();
        let url = docs.create_document("Title").await.unwrap();
        assert_eq!(url, "https://docs.google.com/document/d/d0c/edit");
    }

    #[tokio::test]
    async fn document_client_requires_document_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/documents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let docs = DocumentClient::new(server.uri()).unwrap();
        let err = docs.create_document("Title").await.unwrap_err();
        assert!(matches!(err, CompletionError::Tool(_)));
    }
}
