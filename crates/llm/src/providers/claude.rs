use serde_json::{json, Value};
use tracing::trace;

use toolgate_tool_runtime::{
    ChatMessage, ChatRole, Conversation, LlmError, ModelTurn, ProviderAdapter, ToolCall,
    ToolDefinition, ToolInvocation, ToolResult,
};

/// Anthropic Messages API wire format.
///
/// Responses are a list of content blocks; `tool_use` blocks carry an `id`
/// that the following user turn must echo as `tool_use_id` in a
/// `tool_result` block.
pub struct ClaudeAdapter {
    model: String,
    max_tokens: u32,
}

impl ClaudeAdapter {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
        }
    }
}

/// Translate a [`ToolDefinition`] into the Claude API tool format.
fn tool_definition_to_claude(tool: &ToolDefinition) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.input_schema,
    })
}

impl ProviderAdapter for ClaudeAdapter {
    fn provider_name(&self) -> &str {
        "claude"
    }

    fn seed_conversation(&self, history: &[ChatMessage], prompt: &str) -> Conversation {
        let mut messages: Vec<Value> = history
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role {
                        ChatRole::User => "user",
                        ChatRole::Assistant => "assistant",
                    },
                    "content": m.content,
                })
            })
            .collect();
        messages.push(json!({ "role": "user", "content": prompt }));
        Conversation::from_messages(messages)
    }

    fn encode_request(&self, conversation: &Conversation, tools: &[ToolDefinition]) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": conversation.messages(),
        });
        if !tools.is_empty() {
            body["tools"] = tools.iter().map(tool_definition_to_claude).collect();
        }
        body
    }

    fn decode_response(&self, response: &Value) -> Result<ModelTurn, LlmError> {
        let blocks = response["content"]
            .as_array()
            .ok_or_else(|| LlmError::InvalidResponse("missing content".into()))?;

        let mut calls = Vec::new();
        let mut text = Vec::new();
        for block in blocks {
            match block["type"].as_str() {
                Some("tool_use") => {
                    let id = block["id"]
                        .as_str()
                        .ok_or_else(|| LlmError::InvalidResponse("tool_use without id".into()))?;
                    let name = block["name"]
                        .as_str()
                        .ok_or_else(|| LlmError::InvalidResponse("tool_use without name".into()))?;
                    // A replayed tool_use must carry an object input.
                    let input = match &block["input"] {
                        Value::Null => json!({}),
                        other => other.clone(),
                    };
                    calls.push(ToolCall {
                        id: id.to_string(),
                        name: name.to_string(),
                        input,
                    });
                }
                Some("text") => {
                    if let Some(t) = block["text"].as_str() {
                        text.push(t);
                    }
                }
                _ => {}
            }
        }
        trace!(
            stop_reason = response["stop_reason"].as_str().unwrap_or("unknown"),
            tool_calls = calls.len(),
            "Decoded Claude response"
        );

        let invocation = ToolInvocation::from_calls(calls, |call| {
            let mut content: Vec<Value> = text
                .iter()
                .map(|t| json!({ "type": "text", "text": t }))
                .collect();
            content.push(json!({
                "type": "tool_use",
                "id": call.id,
                "name": call.name,
                "input": call.input,
            }));
            json!({ "role": "assistant", "content": content })
        });

        Ok(match invocation {
            Some(inv) => ModelTurn::ToolUse(inv),
            None if text.is_empty() => ModelTurn::Final(None),
            None => ModelTurn::Final(Some(text.concat())),
        })
    }

    fn encode_tool_result(&self, result: &ToolResult) -> Value {
        json!({
            "role": "user",
            "content": [{
                "type": "tool_result",
                "tool_use_id": result.tool_call_id,
                "content": result.content,
                "is_error": result.is_error,
            }],
        })
    }
}
