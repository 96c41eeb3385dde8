//! POST /chat — streaming chat proxy.
//!
//! Forwards the caller's role-tagged message list to the hosted language
//! model and relays text deltas back as SSE events. Mid-stream failures are
//! handled inside the completion client (logged, stream ends); only request
//! construction errors surface as HTTP error responses.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::{Stream, StreamExt};
use pulse_core::{ChatMessage, ChatRole};
use serde::Deserialize;

use crate::http::{ErrorResponse, HttpState};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<IncomingMessage>,
}

/// The browser-side message shape: role + plain text content.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Validate the incoming message list. System and tool roles are reserved
/// for the server side of the conversation.
pub fn validate_messages(messages: &[IncomingMessage]) -> Result<Vec<ChatMessage>, String> {
    if messages.is_empty() {
        return Err("messages must not be empty".to_string());
    }
    messages
        .iter()
        .map(|m| match m.role {
            ChatRole::User => Ok(ChatMessage::user(m.content.clone())),
            ChatRole::Assistant => Ok(ChatMessage::assistant(m.content.clone())),
            ChatRole::System | ChatRole::Tool => {
                Err("only user and assistant roles are accepted".to_string())
            }
        })
        .collect()
}

pub async fn chat_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let client = match &state.chat {
        Some(c) => c,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new("chat is not configured")),
            )
                .into_response();
        }
    };

    let messages = match validate_messages(&req.messages) {
        Ok(m) => m,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e))).into_response();
        }
    };

    let rx = client.stream_chat(messages);
    let stream: std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>> =
        Box::pin(rx.map(|text| Ok(Event::default().data(text))));

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}
