//! Chat endpoint: the UI boundary of the conversation loop.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use toolgate_llm::ProviderKind;
use toolgate_tool_runtime::{ChatMessage, ChatRole};

use super::ErrorResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// `openai`, `gemini` or `claude`.
    pub provider: String,
    /// Full transcript; the last entry must be the user's new prompt.
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ChatReply {
    pub role: &'static str,
    pub content: String,
}

#[utoipa::path(
    post,
    path = "/chat",
    tag = "Chat",
    request_body(content = Object, description = "{provider, messages:[{role, content}]}"),
    responses(
        (status = 200, description = "Assistant reply; failures are rendered as \"Error: ...\" text", body = ChatReply),
        (status = 400, description = "No user prompt in the transcript", body = ErrorResponse)
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, (StatusCode, Json<ErrorResponse>)> {
    let Some((prompt, history)) = req.messages.split_last() else {
        return Err(bad_request("messages must not be empty"));
    };
    if prompt.role != ChatRole::User {
        return Err(bad_request("last message must come from the user"));
    }

    info!(provider = %req.provider, history = history.len(), "Chat turn");

    let reply = match req
        .provider
        .parse::<ProviderKind>()
        .and_then(|kind| state.providers.provider(kind))
    {
        Ok(provider) => {
            let tools = state.chat_tools.for_turn();
            let reply = state
                .conversation(&tools)
                .reply(
                    provider.adapter.as_ref(),
                    provider.vendor.as_ref(),
                    &prompt.content,
                    history,
                )
                .await;
            tools.finish().await;
            reply
        }
        Err(e) => {
            tracing::warn!(provider = %req.provider, error = %e, "Provider unavailable");
            ChatMessage::assistant(format!("Error: {}", e))
        }
    };

    Ok(Json(ChatReply {
        role: "assistant",
        content: reply.content,
    }))
}

fn bad_request(msg: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
}
