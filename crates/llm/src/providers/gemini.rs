use serde_json::{json, Map, Value};
use tracing::trace;

use toolgate_tool_runtime::{
    ChatMessage, ChatRole, Conversation, LlmError, ModelTurn, ProviderAdapter, ToolCall,
    ToolDefinition, ToolInvocation, ToolResult,
};

/// Gemini `generateContent` wire format.
///
/// Messages are `contents` with roles `user` / `model` and a list of
/// `parts`. Tools are declared under `tools[0].functionDeclarations`.
/// Function calls carry an optional `id`; when absent the function name is
/// the correlation token, which is how Gemini matches positional results.
pub struct GeminiAdapter {
    max_tokens: u32,
}

impl GeminiAdapter {
    pub fn new(max_tokens: u32) -> Self {
        Self { max_tokens }
    }
}

fn text_content(role: &str, text: &str) -> Value {
    json!({ "role": role, "parts": [{ "text": text }] })
}

fn parse_function_call(fc: &Value) -> Result<ToolCall, LlmError> {
    let name = fc["name"]
        .as_str()
        .ok_or_else(|| LlmError::InvalidResponse("functionCall without name".into()))?;
    let id = fc["id"].as_str().unwrap_or(name);
    let input = match &fc["args"] {
        Value::Null => json!({}),
        args => args.clone(),
    };
    Ok(ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        input,
    })
}

impl ProviderAdapter for GeminiAdapter {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn seed_conversation(&self, history: &[ChatMessage], prompt: &str) -> Conversation {
        let mut contents: Vec<Value> = history
            .iter()
            .map(|m| {
                let role = match m.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "model",
                };
                text_content(role, &m.content)
            })
            .collect();
        contents.push(text_content("user", prompt));
        Conversation::from_messages(contents)
    }

    fn encode_request(&self, conversation: &Conversation, tools: &[ToolDefinition]) -> Value {
        let mut body = json!({
            "contents": conversation.messages(),
            "generationConfig": {
                "maxOutputTokens": self.max_tokens,
            },
        });
        if !tools.is_empty() {
            let declarations: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.input_schema,
                    })
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }
        body
    }

    fn decode_response(&self, response: &Value) -> Result<ModelTurn, LlmError> {
        let candidates = response["candidates"]
            .as_array()
            .ok_or_else(|| LlmError::InvalidResponse("missing candidates".into()))?;
        // Safety-blocked prompts come back with no candidates at all.
        let Some(candidate) = candidates.first() else {
            return Ok(ModelTurn::Final(None));
        };

        let parts = candidate["content"]["parts"].as_array().cloned().unwrap_or_default();
        let calls = parts
            .iter()
            .filter_map(|p| p.get("functionCall"))
            .map(parse_function_call)
            .collect::<Result<Vec<_>, _>>()?;
        trace!(parts = parts.len(), tool_calls = calls.len(), "Decoded Gemini response");

        let invocation = ToolInvocation::from_calls(calls, |call| {
            let mut fc = Map::new();
            fc.insert("name".into(), json!(call.name));
            fc.insert("args".into(), call.input.clone());
            if call.id != call.name {
                fc.insert("id".into(), json!(call.id));
            }
            json!({ "role": "model", "parts": [{ "functionCall": fc }] })
        });
        if let Some(inv) = invocation {
            return Ok(ModelTurn::ToolUse(inv));
        }

        let text: Vec<&str> = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        Ok(ModelTurn::Final(if text.is_empty() {
            None
        } else {
            Some(text.concat())
        }))
    }

    fn encode_tool_result(&self, result: &ToolResult) -> Value {
        let mut response = Map::new();
        response.insert("name".into(), json!(result.tool_name));
        if result.tool_call_id != result.tool_name {
            response.insert("id".into(), json!(result.tool_call_id));
        }
        response.insert("response".into(), json!({ "result": result.content }));
        json!({ "role": "user", "parts": [{ "functionResponse": response }] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_int() -> ToolDefinition {
        ToolDefinition {
            name: "randomInt".into(),
            description: "Random integer below max".into(),
            input_schema: json!({"type": "object"}),
        }
    }

    fn call_response(parts: Value) -> Value {
        json!({"candidates": [{"content": {"role": "model", "parts": parts}}]})
    }

    #[test]
    fn test_request_body_structure() {
        let a = GeminiAdapter::new(4096);
        let history = vec![ChatMessage::user("Hello"), ChatMessage::assistant("Hi there!")];
        let body = a.encode_request(&a.seed_conversation(&history, "How are you?"), &[random_int()]);

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        // Assistant turns are "model", not "assistant"
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["text"], "Hi there!");
        assert_eq!(contents[2]["parts"][0]["text"], "How are you?");

        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "randomInt");
    }

    #[test]
    fn test_decode_text_parts_concatenated() {
        let resp = call_response(json!([{"text": "I picked "}, {"text": "7"}]));
        match GeminiAdapter::new(1).decode_response(&resp).unwrap() {
            ModelTurn::Final(text) => assert_eq!(text.as_deref(), Some("I picked 7")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_empty_candidates_is_silence() {
        let a = GeminiAdapter::new(1);
        assert!(matches!(
            a.decode_response(&json!({"candidates": []})).unwrap(),
            ModelTurn::Final(None)
        ));
        assert!(matches!(
            a.decode_response(&call_response(json!([]))).unwrap(),
            ModelTurn::Final(None)
        ));
        assert!(a.decode_response(&json!({"error": {}})).is_err());
    }

    #[test]
    fn test_function_call_without_id_uses_name() {
        let resp = call_response(json!([{"functionCall": {"name": "randomInt", "args": {"max": 10}}}]));
        let ModelTurn::ToolUse(inv) = GeminiAdapter::new(1).decode_response(&resp).unwrap() else {
            panic!("expected tool use");
        };
        assert_eq!(inv.call.id, "randomInt");
        assert_eq!(inv.call.input, json!({"max": 10}));
        assert!(inv.assistant_message["parts"][0]["functionCall"].get("id").is_none());
    }

    #[test]
    fn test_parallel_function_calls_keep_first() {
        let resp = call_response(json!([
            {"functionCall": {"name": "randomInt", "args": {}}},
            {"functionCall": {"name": "weather"}}
        ]));
        let ModelTurn::ToolUse(inv) = GeminiAdapter::new(1).decode_response(&resp).unwrap() else {
            panic!("expected tool use");
        };
        assert_eq!(inv.call.name, "randomInt");
        assert_eq!(inv.unanswered_names(), vec!["weather"]);
    }

    #[test]
    fn test_tool_result_keeps_correlation_token() {
        let a = GeminiAdapter::new(1);
        for (fc, token) in [
            (json!({"name": "randomInt", "args": {"max": 10}, "id": "fc-9"}), "fc-9"),
            (json!({"name": "randomInt", "args": {"max": 10}}), "randomInt"),
        ] {
            let resp = call_response(json!([{ "functionCall": fc }]));
            let ModelTurn::ToolUse(inv) = a.decode_response(&resp).unwrap() else {
                panic!("expected tool use");
            };

            let mut conv = a.seed_conversation(&[], "pick a number under 10");
            conv.push(inv.assistant_message.clone());
            conv.push(a.encode_tool_result(&ToolResult::for_call(&inv.call, "7")));
            let body = a.encode_request(&conv, &[random_int()]);

            let fr = &body["contents"][2]["parts"][0]["functionResponse"];
            assert_eq!(body["contents"][2]["role"], "user");
            assert_eq!(fr["name"], "randomInt");
            assert_eq!(fr["response"]["result"], "7");
            let echoed = fr.get("id").and_then(Value::as_str).unwrap_or("randomInt");
            assert_eq!(echoed, token);

            let redecoded = parse_function_call(&body["contents"][1]["parts"][0]["functionCall"]).unwrap();
            assert_eq!(redecoded.id, token);
        }
    }
}
