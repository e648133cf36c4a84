//! One session's conversation with the tool service.
//!
//! A [`SessionTransport`] decodes inbound JSON-RPC envelopes, dispatches them
//! to its [`ToolService`] and encodes the outcome. Requests on the same
//! transport are handled one at a time in arrival order: the state lock is
//! held for the whole request, and tokio's mutex is fair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use toolgate_tool_runtime::ToolService;

use crate::error::McpError;
use crate::types::*;

/// What the gateway should send back for one envelope.
#[derive(Debug, Clone)]
pub enum TransportReply {
    /// A request was answered (successfully or with a JSON-RPC error).
    Response(JsonRpcResponse),
    /// A notification was accepted; there is no response body.
    Accepted,
}

/// Snapshot returned to continuation (GET) requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub initialized: bool,
    pub requests_handled: u64,
    pub last_response: Option<JsonRpcResponse>,
}

struct TransportState {
    initialized: bool,
    requests_handled: u64,
    last_response: Option<JsonRpcResponse>,
    last_activity: Instant,
}

enum Envelope {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

pub struct SessionTransport {
    id: String,
    service: Arc<dyn ToolService>,
    created_at: DateTime<Utc>,
    state: Mutex<TransportState>,
}

impl SessionTransport {
    pub fn new(id: impl Into<String>, service: Arc<dyn ToolService>) -> Self {
        Self {
            id: id.into(),
            service,
            created_at: Utc::now(),
            state: Mutex::new(TransportState {
                initialized: false,
                requests_handled: 0,
                last_response: None,
                last_activity: Instant::now(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Handle one raw envelope body.
    ///
    /// Never fails: malformed input becomes a JSON-RPC error response and is
    /// not dispatched to the tool service.
    pub async fn handle(&self, body: &str) -> TransportReply {
        let mut state = self.state.lock().await;
        state.last_activity = Instant::now();

        let reply = match decode_envelope(body) {
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "Rejected envelope");
                TransportReply::Response(JsonRpcResponse::error(None, e.to_rpc_error()))
            }
            Ok(Envelope::Notification(notif)) => {
                self.handle_notification(&notif);
                TransportReply::Accepted
            }
            Ok(Envelope::Request(request)) => {
                let id = request.id.clone();
                let response = match self.dispatch(&mut state, request).await {
                    Ok(result) => JsonRpcResponse::success(id, result),
                    Err(e) => JsonRpcResponse::error(Some(id), e.to_rpc_error()),
                };
                TransportReply::Response(response)
            }
        };

        state.requests_handled += 1;
        if let TransportReply::Response(response) = &reply {
            state.last_response = Some(response.clone());
        }
        state.last_activity = Instant::now();
        reply
    }

    /// Current status. Waits behind any request already in flight.
    pub async fn status(&self) -> SessionStatus {
        let state = self.state.lock().await;
        SessionStatus {
            session_id: self.id.clone(),
            created_at: self.created_at,
            initialized: state.initialized,
            requests_handled: state.requests_handled,
            last_response: state.last_response.clone(),
        }
    }

    /// Time since the last request finished, or `None` while one is in flight.
    pub fn idle_for(&self) -> Option<Duration> {
        self.state
            .try_lock()
            .ok()
            .map(|state| state.last_activity.elapsed())
    }

    async fn dispatch(
        &self,
        state: &mut TransportState,
        request: JsonRpcRequest,
    ) -> Result<Value, McpError> {
        tracing::debug!(session_id = %self.id, method = %request.method, "Dispatching request");
        match request.method.as_str() {
            "initialize" => {
                let result = self.handle_initialize(request.params)?;
                state.initialized = true;
                Ok(result)
            }
            "ping" => Ok(Value::Object(Map::new())),
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => self.handle_call_tool(request.params).await,
            method => {
                tracing::warn!(session_id = %self.id, method = %method, "Unknown method");
                Err(McpError::MethodNotFound(method.to_string()))
            }
        }
    }

    fn handle_notification(&self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" => {
                tracing::info!(session_id = %self.id, "Client confirmed initialization");
            }
            method => {
                tracing::debug!(session_id = %self.id, method = %method, "Ignoring notification");
            }
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> Result<Value, McpError> {
        if let Some(params) = params {
            let params: InitializeParams = serde_json::from_value(params)
                .map_err(|e| McpError::InvalidParams(e.to_string()))?;
            tracing::info!(
                session_id = %self.id,
                client = %params.client_info.name,
                protocol = %params.protocol_version,
                "Session initialized"
            );
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: PeerInfo {
                name: "toolgate".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
        };
        serde_json::to_value(result).map_err(|e| McpError::Internal(e.to_string()))
    }

    async fn handle_list_tools(&self) -> Result<Value, McpError> {
        let tools = self
            .service
            .list_tools()
            .await
            .map_err(|e| McpError::Internal(e.to_string()))?;
        let result = ListToolsResult {
            tools: tools.into_iter().map(ToolInfo::from).collect(),
        };
        serde_json::to_value(result).map_err(|e| McpError::Internal(e.to_string()))
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params = params.ok_or_else(|| McpError::InvalidParams("missing params".to_string()))?;
        let call: CallToolParams =
            serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))?;

        tracing::info!(session_id = %self.id, tool = %call.name, "Invoking tool");
        let result = match self.service.invoke(&call.name, call.arguments).await {
            Ok(text) => CallToolResult::text(text, false),
            Err(e) => {
                tracing::warn!(session_id = %self.id, tool = %call.name, error = %e, "Tool failed");
                CallToolResult::text(e.to_string(), true)
            }
        };
        serde_json::to_value(result).map_err(|e| McpError::Internal(e.to_string()))
    }
}

fn decode_envelope(body: &str) -> Result<Envelope, McpError> {
    let raw: Value = serde_json::from_str(body)?;
    let mut obj = match raw {
        Value::Object(obj) => obj,
        _ => return Err(McpError::InvalidRequest("expected a JSON object".to_string())),
    };

    match obj.get("jsonrpc") {
        None => {}
        Some(Value::String(v)) if v == "2.0" => {}
        Some(_) => return Err(McpError::InvalidRequest("jsonrpc must be \"2.0\"".to_string())),
    }

    let method = match obj.remove("method") {
        Some(Value::String(m)) => m,
        _ => return Err(McpError::InvalidRequest("missing method".to_string())),
    };
    let params = obj.remove("params");

    match obj.remove("id") {
        None => Ok(Envelope::Notification(JsonRpcNotification::new(method, params))),
        Some(id) => {
            let id: RpcId = serde_json::from_value(id)
                .map_err(|_| McpError::InvalidRequest("id must be a string or number".to_string()))?;
            Ok(Envelope::Request(JsonRpcRequest::new(id, method, params)))
        }
    }
}
