//! Runs the gateway on a real socket and drives it with `GatewayClient`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use toolgate_core::Config;
use toolgate_llm::{Provider, ProviderKind, ProviderPool, ProviderSource};
use toolgate_mcp::{GatewayClient, SESSION_HEADER};
use toolgate_server::{build_router, AppState, ChatTools};
use toolgate_tool_runtime::provider::mock::{ScriptedAdapter, ScriptedVendor};
use toolgate_tool_runtime::{
    ConversationLoop, LlmError, Tool, ToolDefinition, ToolError, ToolRegistry, ToolService,
};

async fn serve(state: Arc<AppState>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_gateway_with(registry: ToolRegistry) -> (String, Arc<AppState>) {
    let registry = Arc::new(registry);
    let config = Config::for_profile("TGITEST");
    let providers = Arc::new(ProviderPool::new(config.llm.clone()));
    let state = Arc::new(AppState::new(
        config,
        registry.clone(),
        ChatTools::Local(registry),
        providers,
    ));
    let base = serve(state.clone()).await;
    (format!("{}/invoke", base), state)
}

async fn spawn_gateway() -> (String, Arc<AppState>) {
    spawn_gateway_with(ToolRegistry::with_builtin_tools()).await
}

/// Sleeps before answering and records the peak number of overlapping calls.
struct SlowTool {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for SlowTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "slow".into(),
            description: "Answers after a pause".into(),
            input_schema: json!({"type": "object"}),
        }
    }

    async fn execute(&self, _input: Value) -> Result<String, ToolError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(300)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("done".into())
    }
}

/// Every conversation gets a fresh scripted vendor.
struct Scripted(Vec<Value>);

impl ProviderSource for Scripted {
    fn provider(&self, _kind: ProviderKind) -> Result<Provider, LlmError> {
        Ok(Provider {
            adapter: Arc::new(ScriptedAdapter),
            vendor: Arc::new(ScriptedVendor::new(self.0.clone())),
        })
    }
}

#[tokio::test]
async fn client_session_lifecycle() {
    let (endpoint, state) = spawn_gateway().await;

    let client = GatewayClient::connect(endpoint.clone()).await.unwrap();
    let session = client.session_id().await.expect("session assigned on first contact");
    assert_eq!(state.sessions.len().await, 1);

    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "randomInt");

    assert_eq!(client.invoke("randomInt", json!({"max": 1})).await.unwrap(), "0");

    let err = client.invoke("randomInt", json!({"max": 0})).await.unwrap_err();
    assert!(matches!(err, ToolError::InvalidArgument(_)), "{err:?}");

    let err = client.invoke("weather", json!({})).await.unwrap_err();
    assert!(matches!(err, ToolError::UnknownTool(name) if name == "weather"));

    // Every call above reused the same transport.
    assert_eq!(state.sessions.len().await, 1);
    let status = client.status().await.unwrap();
    assert_eq!(status.session_id, session);
    assert!(status.initialized);
    // initialize, the initialized notification, tools/list, three tools/call
    assert_eq!(status.requests_handled, 6);
    assert!(status.last_response.is_some());

    client.close().await.unwrap();
    assert!(state.sessions.is_empty().await);

    let resp = reqwest::Client::new()
        .get(&endpoint)
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Bad Session");
}

#[tokio::test]
async fn separate_clients_get_separate_sessions() {
    let (endpoint, state) = spawn_gateway().await;

    let a = GatewayClient::connect(endpoint.clone()).await.unwrap();
    let b = GatewayClient::connect(endpoint).await.unwrap();
    assert_ne!(a.session_id().await, b.session_id().await);
    assert_eq!(state.sessions.len().await, 2);

    a.invoke("randomInt", json!({"max": 5})).await.unwrap();
    assert_eq!(b.status().await.unwrap().requests_handled, 2);
}

#[tokio::test]
async fn conversation_loop_over_remote_tools() {
    let (endpoint, state) = spawn_gateway().await;
    let tools = Arc::new(GatewayClient::new(endpoint));

    let vendor = ScriptedVendor::new([
        ScriptedAdapter::tool_call("c1", "randomInt", json!({"max": 1})),
        ScriptedAdapter::text("I picked 0"),
    ]);
    let answer = ConversationLoop::new(tools.clone())
        .run(&ScriptedAdapter, &vendor, "pick a number under 1", &[])
        .await
        .unwrap();
    assert_eq!(answer, "I picked 0");

    let requests = vendor.requests();
    assert_eq!(requests[0]["tools"], json!(["randomInt"]));
    assert_eq!(requests[1]["messages"][2]["content"], "0");

    // list_tools and one tools/call, both on one lazily created session.
    let status = tools.status().await.unwrap();
    assert_eq!(status.requests_handled, 2);
    assert!(!status.initialized);
    assert_eq!(state.sessions.len().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn remote_chat_turns_do_not_share_a_session() {
    let peak = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    registry
        .register(SlowTool {
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: peak.clone(),
        })
        .unwrap();
    let (endpoint, gateway) = spawn_gateway_with(registry).await;

    let chat_state = Arc::new(AppState::new(
        Config::for_profile("TGITEST"),
        Arc::new(ToolRegistry::with_builtin_tools()),
        ChatTools::remote(endpoint),
        Arc::new(Scripted(vec![
            ScriptedAdapter::tool_call("c1", "slow", json!({})),
            ScriptedAdapter::text("finished"),
        ])),
    ));
    let chat_url = format!("{}/chat", serve(chat_state).await);

    let http = reqwest::Client::new();
    let turns = (0..4).map(|i| {
        http.post(&chat_url)
            .json(&json!({"provider": "openai", "messages": [{"role": "user", "content": format!("turn {i}")}]}))
            .send()
    });
    for resp in futures::future::join_all(turns).await {
        let body: Value = resp.unwrap().json().await.unwrap();
        assert_eq!(body["content"], "finished");
    }

    assert!(peak.load(Ordering::SeqCst) > 1, "remote tool calls were serialized");
    // Each turn retires its own session when it ends.
    assert!(gateway.sessions.is_empty().await);
}
