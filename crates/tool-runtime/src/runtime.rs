use std::sync::Arc;
use tracing::{debug, info, warn};

use toolgate_core::{Classify, ErrorClass};

use crate::conversation::ChatMessage;
use crate::provider::{LlmError, ModelTurn, ProviderAdapter, VendorClient};
use crate::service::ToolService;
use crate::tool::{ToolError, ToolResult};

/// Tool executions allowed per conversation turn unless overridden.
pub const DEFAULT_MAX_HOPS: usize = 3;

/// Substituted for an empty or absent final answer.
pub const NO_RESPONSE: &str = "(no response)";

/// Drives one user turn: send → maybe execute a tool → resend, until the
/// vendor answers in plain text or the hop limit is hit.
///
/// Flow: prompt → vendor → ToolCall → ToolService → result → vendor → ... → answer
pub struct ConversationLoop {
    tools: Arc<dyn ToolService>,
    max_hops: usize,
}

impl ConversationLoop {
    pub fn new(tools: Arc<dyn ToolService>) -> Self {
        Self {
            tools,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    pub fn with_max_hops(mut self, max: usize) -> Self {
        self.max_hops = max;
        self
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Run a single user turn and return the final answer text.
    ///
    /// At most `max_hops` tools are executed; a further tool request is a
    /// [`LoopError::TooManyHops`]. `history` is never modified.
    pub async fn run(
        &self,
        adapter: &dyn ProviderAdapter,
        vendor: &dyn VendorClient,
        prompt: &str,
        history: &[ChatMessage],
    ) -> Result<String, LoopError> {
        let provider = adapter.provider_name();
        let tools = self.tools.list_tools().await?;
        let mut conversation = adapter.seed_conversation(history, prompt);
        let mut executed = 0usize;

        loop {
            debug!(provider, hop = executed, messages = conversation.len(), "Sending hop");
            let request = adapter.encode_request(&conversation, &tools);
            let response = vendor.send(request).await?;

            let invocation = match adapter.decode_response(&response)? {
                ModelTurn::Final(text) => {
                    info!(provider, hops = executed, "Conversation turn complete");
                    return Ok(text
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| NO_RESPONSE.to_string()));
                }
                ModelTurn::ToolUse(invocation) => invocation,
            };

            if executed >= self.max_hops {
                warn!(provider, max_hops = self.max_hops, tool = %invocation.call.name, "Hop limit reached");
                return Err(LoopError::TooManyHops(self.max_hops));
            }
            executed += 1;

            let call = &invocation.call;
            info!(provider, hop = executed, tool = %call.name, call_id = %call.id, "Executing tool call");
            let output = self.tools.invoke(&call.name, call.input.clone()).await?;

            if !invocation.unanswered.is_empty() {
                let unanswered = invocation.unanswered_names();
                warn!(provider, executed = %call.name, ?unanswered, "Dropping simultaneous tool calls");
                return Err(LoopError::UnhandledToolCalls {
                    executed: call.name.clone(),
                    unanswered,
                });
            }

            let result = ToolResult::for_call(call, output);
            conversation.push(invocation.assistant_message);
            conversation.push(adapter.encode_tool_result(&result));
        }
    }

    /// Run a turn and render the outcome as an assistant message.
    ///
    /// Failures become plain-text error replies so the caller's session
    /// survives; prior history is untouched either way.
    pub async fn reply(
        &self,
        adapter: &dyn ProviderAdapter,
        vendor: &dyn VendorClient,
        prompt: &str,
        history: &[ChatMessage],
    ) -> ChatMessage {
        match self.run(adapter, vendor, prompt, history).await {
            Ok(answer) => ChatMessage::assistant(answer),
            Err(e) => {
                warn!(provider = adapter.provider_name(), class = %e.class(), error = %e, "Conversation turn failed");
                ChatMessage::assistant(format!("Error: {}", e))
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("LLM error: {0}")]
    Vendor(#[from] LlmError),
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
    /// The vendor asked for several tools in one turn. Only the first is
    /// honored: `executed` has already run, and its result is discarded
    /// along with the turn. The calls in `unanswered` were never invoked.
    #[error("Model requested several tools at once; executed '{executed}', left unanswered: {}", .unanswered.join(", "))]
    UnhandledToolCalls {
        executed: String,
        unanswered: Vec<String>,
    },
    #[error("Too many tool hops (limit {0})")]
    TooManyHops(usize),
}

impl Classify for LoopError {
    fn class(&self) -> ErrorClass {
        match self {
            LoopError::Vendor(e) => e.class(),
            LoopError::Tool(e) => e.class(),
            _ => ErrorClass::Application,
        }
    }
}
