use std::sync::Arc;
use std::time::Instant;

use toolgate_core::Config;
use toolgate_llm::{ProviderPool, ProviderSource};
use toolgate_mcp::{GatewayClient, SessionRegistry};
use toolgate_tool_runtime::{ConversationLoop, ToolRegistry, ToolService};

/// Where chat conversations get their tools from.
pub enum ChatTools {
    /// The in-process registry, shared by every turn.
    Local(Arc<dyn ToolService>),
    /// A remote gateway. Each turn opens its own session so unrelated
    /// conversations never queue behind one another.
    Remote {
        http: reqwest::Client,
        endpoint: String,
    },
}

impl ChatTools {
    pub fn remote(endpoint: impl Into<String>) -> Self {
        ChatTools::Remote {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Tools for one conversation turn.
    pub fn for_turn(&self) -> TurnTools {
        match self {
            ChatTools::Local(service) => TurnTools {
                service: service.clone(),
                remote: None,
            },
            ChatTools::Remote { http, endpoint } => {
                let client = Arc::new(GatewayClient::with_http_client(http.clone(), endpoint.clone()));
                TurnTools {
                    service: client.clone(),
                    remote: Some(client),
                }
            }
        }
    }
}

/// The tool service backing a single turn.
pub struct TurnTools {
    pub service: Arc<dyn ToolService>,
    remote: Option<Arc<GatewayClient>>,
}

impl TurnTools {
    /// Retire the turn's remote session, if one was opened.
    pub async fn finish(self) {
        if let Some(client) = self.remote {
            if let Err(e) = client.close().await {
                tracing::warn!(error = %e, "Failed to close gateway session");
            }
        }
    }
}

pub struct AppState {
    pub config: Config,
    /// Gateway sessions, all bound to the in-process tool registry.
    pub sessions: SessionRegistry,
    pub chat_tools: ChatTools,
    pub providers: Arc<dyn ProviderSource>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: Config,
        registry: Arc<ToolRegistry>,
        chat_tools: ChatTools,
        providers: Arc<dyn ProviderSource>,
    ) -> Self {
        Self {
            sessions: SessionRegistry::new(registry),
            chat_tools,
            providers,
            config,
            started_at: Instant::now(),
        }
    }

    /// Wire everything from configuration.
    pub fn from_config(config: Config) -> Self {
        let registry = Arc::new(ToolRegistry::with_builtin_tools());
        let chat_tools = match &config.tools.gateway_url {
            Some(url) => {
                tracing::info!(gateway = %url, "Chat tools served by remote gateway");
                ChatTools::remote(url.clone())
            }
            None => ChatTools::Local(registry.clone()),
        };
        let providers = Arc::new(ProviderPool::new(config.llm.clone()));
        Self::new(config, registry, chat_tools, providers)
    }

    /// A conversation loop over `tools`, with the configured hop limit.
    pub fn conversation(&self, tools: &TurnTools) -> ConversationLoop {
        ConversationLoop::new(tools.service.clone()).with_max_hops(self.config.llm.max_hops)
    }
}
