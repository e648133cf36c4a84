use serde_json::{json, Value};
use tracing::trace;

use toolgate_tool_runtime::{
    ChatMessage, ChatRole, Conversation, LlmError, ModelTurn, ProviderAdapter, ToolCall,
    ToolDefinition, ToolInvocation, ToolResult,
};

/// OpenAI Chat Completions wire format.
///
/// Tools go in a top-level `tools` array of `{type: "function", function}`.
/// Tool calls arrive in `choices[0].message.tool_calls` with JSON-encoded
/// argument strings; results are threaded back as `role: "tool"` messages
/// keyed by `tool_call_id`.
pub struct OpenAiAdapter {
    model: String,
    max_tokens: u32,
}

impl OpenAiAdapter {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
        }
    }
}

fn tool_definition_to_openai(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        }
    })
}

fn parse_tool_call(raw: &Value) -> Result<ToolCall, LlmError> {
    let id = raw["id"]
        .as_str()
        .ok_or_else(|| LlmError::InvalidResponse("tool call without id".into()))?;
    let name = raw["function"]["name"]
        .as_str()
        .ok_or_else(|| LlmError::InvalidResponse("tool call without function name".into()))?;

    // Arguments are a JSON document inside a string; empty means no arguments.
    let input = match raw["function"]["arguments"].as_str() {
        None | Some("") => json!({}),
        Some(args) => serde_json::from_str(args).map_err(|e| {
            LlmError::InvalidResponse(format!("tool call '{}' has malformed arguments: {}", name, e))
        })?,
    };

    Ok(ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        input,
    })
}

impl ProviderAdapter for OpenAiAdapter {
    fn provider_name(&self) -> &str {
        "openai"
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
            "messages": conversation.messages(),
            "max_tokens": self.max_tokens,
        });
        if !tools.is_empty() {
            body["tools"] = tools.iter().map(tool_definition_to_openai).collect();
        }
        body
    }

    fn decode_response(&self, response: &Value) -> Result<ModelTurn, LlmError> {
        let message = response["choices"]
            .get(0)
            .map(|c| &c["message"])
            .filter(|m| m.is_object())
            .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message".into()))?;

        let calls = match message["tool_calls"].as_array() {
            Some(raw) => raw.iter().map(parse_tool_call).collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        trace!(tool_calls = calls.len(), "Decoded OpenAI response");

        let invocation = ToolInvocation::from_calls(calls, |call| {
            json!({
                "role": "assistant",
                "content": message["content"].clone(),
                "tool_calls": [{
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.input.to_string(),
                    }
                }]
            })
        });

        Ok(match invocation {
            Some(inv) => ModelTurn::ToolUse(inv),
            None => ModelTurn::Final(message["content"].as_str().map(String::from)),
        })
    }

    fn encode_tool_result(&self, result: &ToolResult) -> Value {
        json!({
            "role": "tool",
            "tool_call_id": result.tool_call_id,
            "content": result.content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> OpenAiAdapter {
        OpenAiAdapter::new("gpt-4o", 1024)
    }

    fn random_int() -> ToolDefinition {
        ToolDefinition {
            name: "randomInt".into(),
            description: "Random integer below max".into(),
            input_schema: json!({"type": "object", "properties": {"max": {"type": "integer"}}}),
        }
    }

    fn tool_call_response(calls: Value) -> Value {
        json!({"choices": [{"message": {"role": "assistant", "content": null, "tool_calls": calls}}]})
    }

    #[test]
    fn test_request_structure() {
        let a = adapter();
        let conv = a.seed_conversation(&[ChatMessage::assistant("Hi there!")], "Hello");
        let body = a.encode_request(&conv, &[random_int()]);

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 1024);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "assistant");
        assert_eq!(messages[1], json!({"role": "user", "content": "Hello"}));
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "randomInt");
        assert_eq!(body["tools"][0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_no_tools_field_without_tools() {
        let a = adapter();
        let body = a.encode_request(&a.seed_conversation(&[], "x"), &[]);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_decode_text() {
        let resp = json!({"choices": [{"message": {"role": "assistant", "content": "I picked 7"}}]});
        match adapter().decode_response(&resp).unwrap() {
            ModelTurn::Final(text) => assert_eq!(text.as_deref(), Some("I picked 7")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_tool_call() {
        let resp = tool_call_response(json!([
            {"id": "call_abc", "type": "function", "function": {"name": "randomInt", "arguments": "{\"max\":10}"}}
        ]));
        let ModelTurn::ToolUse(inv) = adapter().decode_response(&resp).unwrap() else {
            panic!("expected tool use");
        };
        assert_eq!(inv.call.id, "call_abc");
        assert_eq!(inv.call.input, json!({"max": 10}));
        assert!(inv.unanswered.is_empty());
        assert_eq!(inv.assistant_message["tool_calls"][0]["id"], "call_abc");
    }

    #[test]
    fn test_decode_parallel_calls_keeps_first() {
        let resp = tool_call_response(json!([
            {"id": "a", "type": "function", "function": {"name": "randomInt", "arguments": "{}"}},
            {"id": "b", "type": "function", "function": {"name": "weather", "arguments": ""}}
        ]));
        let ModelTurn::ToolUse(inv) = adapter().decode_response(&resp).unwrap() else {
            panic!("expected tool use");
        };
        assert_eq!(inv.call.name, "randomInt");
        assert_eq!(inv.unanswered_names(), vec!["weather"]);
        assert_eq!(inv.assistant_message["tool_calls"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_decode_errors() {
        let a = adapter();
        assert!(matches!(
            a.decode_response(&json!({"error": "x"})),
            Err(LlmError::InvalidResponse(_))
        ));
        let bad_args = tool_call_response(json!([
            {"id": "a", "function": {"name": "randomInt", "arguments": "{max"}}
        ]));
        assert!(matches!(a.decode_response(&bad_args), Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_tool_result_keeps_correlation_token() {
        let a = adapter();
        let resp = tool_call_response(json!([
            {"id": "call_xyz", "type": "function", "function": {"name": "randomInt", "arguments": "{\"max\":10}"}}
        ]));
        let ModelTurn::ToolUse(inv) = a.decode_response(&resp).unwrap() else {
            panic!("expected tool use");
        };

        let mut conv = a.seed_conversation(&[], "pick a number under 10");
        conv.push(inv.assistant_message.clone());
        conv.push(a.encode_tool_result(&ToolResult::for_call(&inv.call, "7")));
        let body = a.encode_request(&conv, &[random_int()]);

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[1]["tool_calls"][0]["id"], "call_xyz");
        assert_eq!(messages[2]["role"], "tool");
        assert_eq!(messages[2]["tool_call_id"], "call_xyz");
        assert_eq!(messages[2]["content"], "7");
    }
}
