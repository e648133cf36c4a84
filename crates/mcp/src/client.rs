//! HTTP client for a remote tool gateway.
//!
//! [`GatewayClient`] speaks JSON-RPC to `POST /invoke`, keeps the session
//! identifier assigned on first contact, and implements [`ToolService`] so a
//! conversation loop can use remote tools exactly like in-process ones.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;

use toolgate_tool_runtime::{ToolDefinition, ToolError, ToolService};

use crate::session::SessionStatus;
use crate::types::*;

pub struct GatewayClient {
    http: reqwest::Client,
    endpoint: String,
    session_id: Mutex<Option<String>>,
    next_id: AtomicI64,
}

impl GatewayClient {
    /// Client for the gateway at `endpoint` (the full `/invoke` URL).
    /// No request is sent until the first call.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_http_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            session_id: Mutex::new(None),
            next_id: AtomicI64::new(1),
        }
    }

    /// Connect and perform the MCP initialization handshake.
    pub async fn connect(endpoint: impl Into<String>) -> Result<Self, ToolError> {
        let client = Self::new(endpoint);
        client.initialize().await?;
        Ok(client)
    }

    pub async fn initialize(&self) -> Result<InitializeResult, ToolError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "toolgate-client",
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        let result = self.request("initialize", Some(params)).await?;
        self.notify("notifications/initialized", None).await?;

        tracing::info!(endpoint = %self.endpoint, "Gateway client initialized");
        Ok(result)
    }

    /// Session identifier assigned by the gateway, once known.
    pub async fn session_id(&self) -> Option<String> {
        self.session_id.lock().await.clone()
    }

    /// Fetch the session status via a continuation request.
    pub async fn status(&self) -> Result<SessionStatus, ToolError> {
        let session = self
            .session_id()
            .await
            .ok_or_else(|| ToolError::ExecutionFailed("no session established".to_string()))?;

        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[(SESSION_QUERY, session.as_str())])
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }
        resp.json()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))
    }

    /// Retire the session on the gateway and forget its identifier.
    pub async fn close(&self) -> Result<(), ToolError> {
        let mut guard = self.session_id.lock().await;
        let Some(session) = guard.take() else {
            return Ok(());
        };

        let resp = self
            .http
            .delete(&self.endpoint)
            .header(SESSION_HEADER, &session)
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }
        tracing::debug!(session_id = %session, "Gateway session closed");
        Ok(())
    }

    /// Send one request and decode its result.
    ///
    /// Until the gateway has assigned a session, the session lock is held
    /// across the round trip so the identifier from the first response is in
    /// place before any later request goes out. Afterwards requests run
    /// concurrently.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, ToolError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(RpcId::Number(id), method, params);

        let guard = self.session_id.lock().await;
        let known = guard.clone();
        let mut first_contact = if known.is_some() {
            drop(guard);
            None
        } else {
            Some(guard)
        };
        tracing::debug!(method = %method, id, session_id = ?known, "Sending gateway request");

        let mut builder = self.http.post(&self.endpoint).json(&request);
        if let Some(sid) = known.as_deref() {
            builder = builder.header(SESSION_HEADER, sid);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        let assigned = resp
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        if let Some(assigned) = assigned.filter(|a| known.as_deref() != Some(a.as_str())) {
            tracing::debug!(session_id = %assigned, "Gateway assigned session");
            match first_contact.as_mut() {
                Some(slot) => **slot = Some(assigned),
                None => *self.session_id.lock().await = Some(assigned),
            }
        }
        drop(first_contact);

        let response: JsonRpcResponse = resp
            .json()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        if let Some(err) = response.error {
            return Err(ToolError::ExecutionFailed(format!(
                "{} (code {})",
                err.message, err.code
            )));
        }
        let result = response
            .result
            .ok_or_else(|| ToolError::ExecutionFailed("missing result".to_string()))?;
        serde_json::from_value(result).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ToolError> {
        let notif = JsonRpcNotification::new(method, params);
        let session = self.session_id().await;

        let mut builder = self.http.post(&self.endpoint).json(&notif);
        if let Some(sid) = session.as_deref() {
            builder = builder.header(SESSION_HEADER, sid);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }
        Ok(())
    }
}

#[async_trait]
impl ToolService for GatewayClient {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        let result: ListToolsResult = self.request("tools/list", None).await?;
        Ok(result.tools.into_iter().map(ToolDefinition::from).collect())
    }

    async fn invoke(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        let params = json!({ "name": name, "arguments": arguments });
        let result: CallToolResult = self.request("tools/call", Some(params)).await?;

        let text = result.joined_text();
        if result.is_error {
            return Err(remote_tool_error(&text));
        }
        Ok(text)
    }
}

async fn rejection(resp: reqwest::Response) -> ToolError {
    let status = resp.status();
    let message = match resp.json::<JsonRpcResponse>().await {
        Ok(JsonRpcResponse { error: Some(err), .. }) => err.message,
        _ => status.to_string(),
    };
    ToolError::ExecutionFailed(format!("gateway rejected request: {message}"))
}

/// Rebuild a [`ToolError`] from the text of an `isError` tool result.
fn remote_tool_error(text: &str) -> ToolError {
    if let Some(name) = text.strip_prefix("Unknown tool: ") {
        ToolError::UnknownTool(name.to_string())
    } else if let Some(reason) = text.strip_prefix("Invalid argument: ") {
        ToolError::InvalidArgument(reason.to_string())
    } else if let Some(reason) = text.strip_prefix("Execution failed: ") {
        ToolError::ExecutionFailed(reason.to_string())
    } else {
        ToolError::ExecutionFailed(text.to_string())
    }
}
