use async_trait::async_trait;
use serde_json::Value;

use toolgate_core::{Classify, ErrorClass};

use crate::conversation::{ChatMessage, Conversation};
use crate::tool::{ToolCall, ToolDefinition, ToolResult};

/// What a vendor response asks the loop to do next.
#[derive(Debug, Clone)]
pub enum ModelTurn {
    /// Plain answer. `None` when the vendor returned no text at all.
    Final(Option<String>),
    /// The model wants a tool executed before it can continue.
    ToolUse(ToolInvocation),
}

/// A decoded tool request: the first call is honored, the rest are reported.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// The call executed this hop.
    pub call: ToolCall,
    /// Further simultaneous calls in the same response. Never executed.
    pub unanswered: Vec<ToolCall>,
    /// Vendor-shaped assistant message carrying `call`, appended to the
    /// conversation before the tool result.
    pub assistant_message: Value,
}

impl ToolInvocation {
    /// Split `calls` into the honored first call and the unanswered rest.
    /// Returns `None` when `calls` is empty.
    pub fn from_calls(
        mut calls: Vec<ToolCall>,
        assistant_message: impl FnOnce(&ToolCall) -> Value,
    ) -> Option<Self> {
        if calls.is_empty() {
            return None;
        }
        let call = calls.remove(0);
        let assistant_message = assistant_message(&call);
        Some(Self {
            call,
            unanswered: calls,
            assistant_message,
        })
    }

    pub fn unanswered_names(&self) -> Vec<String> {
        self.unanswered.iter().map(|c| c.name.clone()).collect()
    }
}

/// Converts between the loop's view of a conversation and one vendor's
/// wire schema.
///
/// Vendors disagree on role names, where tool schemas go, whether several
/// tool calls per response are modeled, and how results are threaded back,
/// so each vendor gets its own adapter behind this contract.
pub trait ProviderAdapter: Send + Sync {
    /// Provider name for logging (e.g., "openai", "gemini", "claude")
    fn provider_name(&self) -> &str;

    /// Encode canonical history plus the new user prompt as wire messages.
    fn seed_conversation(&self, history: &[ChatMessage], prompt: &str) -> Conversation;

    /// Build the full request body for one hop.
    fn encode_request(&self, conversation: &Conversation, tools: &[ToolDefinition]) -> Value;

    /// Interpret a vendor response body.
    fn decode_response(&self, response: &Value) -> Result<ModelTurn, LlmError>;

    /// Encode a tool result as the continuation message appended before resubmitting.
    fn encode_tool_result(&self, result: &ToolResult) -> Value;
}

/// Performs the vendor HTTP call for a prepared request body.
#[async_trait]
pub trait VendorClient: Send + Sync {
    async fn send(&self, request: Value) -> Result<Value, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API error: {status} - {body}")]
    ApiError { status: u16, body: String },
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl Classify for LlmError {
    fn class(&self) -> ErrorClass {
        match self {
            LlmError::NetworkError(_) => ErrorClass::Transport,
            _ => ErrorClass::Application,
        }
    }
}

/// Scripted doubles for exercising the loop without real vendors.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use crate::conversation::ChatRole;
    use crate::service::ToolService;
    use crate::tool::ToolError;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// A vendor that replays queued response bodies in order and records
    /// every request it receives.
    pub struct ScriptedVendor {
        responses: Mutex<VecDeque<Value>>,
        requests: Mutex<Vec<Value>>,
    }

    impl ScriptedVendor {
        pub fn new(responses: impl IntoIterator<Item = Value>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Requests received so far, oldest first.
        pub fn requests(&self) -> Vec<Value> {
            self.requests.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl VendorClient for ScriptedVendor {
        async fn send(&self, request: Value) -> Result<Value, LlmError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::InvalidResponse("script exhausted".to_string()))
        }
    }

    /// A vendor that always fails at the network level.
    pub struct UnreachableVendor;

    #[async_trait]
    impl VendorClient for UnreachableVendor {
        async fn send(&self, _request: Value) -> Result<Value, LlmError> {
            Err(LlmError::NetworkError("connection refused".to_string()))
        }
    }

    /// Minimal adapter with a flat wire format, for loop tests.
    ///
    /// Responses look like `{"text": "..."}` or
    /// `{"tool_calls": [{"id", "name", "arguments"}]}`.
    pub struct ScriptedAdapter;

    impl ScriptedAdapter {
        pub fn text(text: &str) -> Value {
            json!({ "text": text })
        }

        pub fn tool_call(id: &str, name: &str, arguments: Value) -> Value {
            json!({ "tool_calls": [{ "id": id, "name": name, "arguments": arguments }] })
        }
    }

    impl ProviderAdapter for ScriptedAdapter {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        fn seed_conversation(&self, history: &[ChatMessage], prompt: &str) -> Conversation {
            let mut conv = Conversation::new();
            for msg in history {
                let role = match msg.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                };
                conv.push(json!({ "role": role, "content": msg.content }));
            }
            conv.push(json!({ "role": "user", "content": prompt }));
            conv
        }

        fn encode_request(&self, conversation: &Conversation, tools: &[ToolDefinition]) -> Value {
            let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
            json!({ "messages": conversation.messages(), "tools": names })
        }

        fn decode_response(&self, response: &Value) -> Result<ModelTurn, LlmError> {
            let calls: Vec<ToolCall> = response["tool_calls"]
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .map(|c| ToolCall {
                            id: c["id"].as_str().unwrap_or_default().to_string(),
                            name: c["name"].as_str().unwrap_or_default().to_string(),
                            input: c["arguments"].clone(),
                        })
                        .collect()
                })
                .unwrap_or_default();

            let invocation = ToolInvocation::from_calls(calls, |call| {
                json!({ "role": "assistant", "tool_call": { "id": call.id, "name": call.name } })
            });
            Ok(match invocation {
                Some(inv) => ModelTurn::ToolUse(inv),
                None => ModelTurn::Final(response["text"].as_str().map(String::from)),
            })
        }

        fn encode_tool_result(&self, result: &ToolResult) -> Value {
            json!({ "role": "tool", "id": result.tool_call_id, "content": result.content })
        }
    }

    /// Wraps a tool service and counts invocations.
    pub struct CountingToolService {
        inner: Arc<dyn ToolService>,
        calls: AtomicUsize,
    }

    impl CountingToolService {
        pub fn new(inner: Arc<dyn ToolService>) -> Self {
            Self {
                inner,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ToolService for CountingToolService {
        async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
            self.inner.list_tools().await
        }

        async fn invoke(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.invoke(name, arguments).await
        }
    }

    /// A tool service that answers every call with a fixed string.
    pub struct FixedToolService {
        pub definitions: Vec<ToolDefinition>,
        pub answer: String,
    }

    #[async_trait]
    impl ToolService for FixedToolService {
        async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
            Ok(self.definitions.clone())
        }

        async fn invoke(&self, name: &str, _arguments: Value) -> Result<String, ToolError> {
            if self.definitions.iter().any(|d| d.name == name) {
                Ok(self.answer.clone())
            } else {
                Err(ToolError::UnknownTool(name.to_string()))
            }
        }
    }
}
