//! Session-scoped JSON-RPC tool gateway.
//!
//! - **types**: JSON-RPC 2.0 envelopes and MCP method payloads
//! - **session**: [`SessionTransport`], one session's serialized request handling
//! - **registry**: [`SessionRegistry`], identifier → transport with atomic get-or-create
//! - **client**: [`GatewayClient`], a remote [`ToolService`](toolgate_tool_runtime::ToolService) over HTTP
//! - **error**: protocol errors and their JSON-RPC codes
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use toolgate_mcp::{SessionRegistry, TransportReply};
//! use toolgate_tool_runtime::ToolRegistry;
//!
//! # async fn example() {
//! let sessions = SessionRegistry::new(Arc::new(ToolRegistry::with_builtin_tools()));
//! let transport = sessions.get_or_create("3f2a").await;
//! let body = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"randomInt","arguments":{"max":10}}}"#;
//! if let TransportReply::Response(resp) = transport.handle(body).await {
//!     println!("{}", serde_json::to_string(&resp).unwrap());
//! }
//! # }
//! ```

pub mod client;
pub mod error;
pub mod registry;
pub mod session;
pub mod types;

pub use client::GatewayClient;
pub use error::McpError;
pub use registry::SessionRegistry;
pub use session::{SessionStatus, SessionTransport, TransportReply};
pub use types::*;
