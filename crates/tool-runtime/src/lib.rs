//! Tool execution runtime for toolgate.
//!
//! - **tool**: the `Tool` extension point and the call/result types
//! - **service**: `ToolService`, the remote-procedure surface the loop and the gateway share
//! - **registry**: in-process `ToolService` backed by registered tools
//! - **conversation**: canonical chat messages and the vendor-shaped wire conversation
//! - **provider**: `ProviderAdapter` / `VendorClient` contracts implemented per vendor
//! - **runtime**: `ConversationLoop`, the bounded tool-calling cycle

pub mod tool;
pub mod tools;
pub mod service;
pub mod registry;
pub mod conversation;
pub mod provider;
pub mod runtime;

pub use tool::{Tool, ToolCall, ToolDefinition, ToolError, ToolResult};
pub use service::ToolService;
pub use registry::{RegistryError, ToolRegistry};
pub use conversation::{ChatMessage, ChatRole, Conversation};
pub use provider::{LlmError, ModelTurn, ProviderAdapter, ToolInvocation, VendorClient};
pub use runtime::{ConversationLoop, LoopError, DEFAULT_MAX_HOPS, NO_RESPONSE};
pub use tools::{RandomIntArgs, RandomIntTool};
