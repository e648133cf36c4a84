pub mod claude;
pub mod gemini;
pub mod openai;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use toolgate_core::config::LlmConfig;
use toolgate_tool_runtime::{LlmError, ProviderAdapter, VendorClient};

use crate::vendor::HttpVendorClient;

/// The vendors a conversation can be routed to. Chosen once per conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Claude,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::OpenAi, ProviderKind::Gemini, ProviderKind::Claude];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Claude => "claude",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" | "chatgpt" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            other => Err(LlmError::NotConfigured(format!(
                "unknown LLM provider: '{}'",
                other
            ))),
        }
    }
}

/// An adapter paired with the client that reaches its vendor.
///
/// Cheap to clone; clones share the vendor's HTTP connection pool.
#[derive(Clone)]
pub struct Provider {
    pub adapter: Arc<dyn ProviderAdapter>,
    pub vendor: Arc<dyn VendorClient>,
}

/// Create the adapter and vendor client for `kind` from config.
pub fn create_provider(kind: ProviderKind, llm_config: &LlmConfig) -> Result<Provider, LlmError> {
    let timeout = Duration::from_secs(llm_config.timeout_secs);
    match kind {
        ProviderKind::OpenAi => {
            let api_key = llm_config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("OPENAI_API_KEY not set".into()))?;
            Ok(Provider {
                adapter: Arc::new(openai::OpenAiAdapter::new(
                    llm_config.openai_model.clone(),
                    llm_config.max_tokens,
                )),
                vendor: Arc::new(HttpVendorClient::openai(
                    api_key.clone(),
                    &llm_config.openai_base_url,
                    timeout,
                )?),
            })
        }
        ProviderKind::Gemini => {
            let api_key = llm_config
                .gemini_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("GEMINI_API_KEY not set".into()))?;
            Ok(Provider {
                adapter: Arc::new(gemini::GeminiAdapter::new(llm_config.max_tokens)),
                vendor: Arc::new(HttpVendorClient::gemini(
                    api_key.clone(),
                    &llm_config.gemini_base_url,
                    &llm_config.gemini_model,
                    timeout,
                )?),
            })
        }
        ProviderKind::Claude => {
            let api_key = llm_config
                .anthropic_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("ANTHROPIC_API_KEY not set".into()))?;
            Ok(Provider {
                adapter: Arc::new(claude::ClaudeAdapter::new(
                    llm_config.anthropic_model.clone(),
                    llm_config.max_tokens,
                )),
                vendor: Arc::new(HttpVendorClient::claude(
                    api_key.clone(),
                    &llm_config.anthropic_base_url,
                    timeout,
                )?),
            })
        }
    }
}

/// Supplies a ready provider for a conversation.
///
/// The server resolves providers through this seam so tests can swap in
/// scripted vendors.
pub trait ProviderSource: Send + Sync {
    fn provider(&self, kind: ProviderKind) -> Result<Provider, LlmError>;
}

/// Providers built once from config and shared by every conversation.
///
/// Kinds without a credential are not built; asking for one reports the
/// missing key.
pub struct ProviderPool {
    config: LlmConfig,
    ready: HashMap<ProviderKind, Provider>,
}

impl ProviderPool {
    pub fn new(config: LlmConfig) -> Self {
        let mut ready = HashMap::new();
        for kind in ProviderKind::ALL {
            match create_provider(kind, &config) {
                Ok(provider) => {
                    ready.insert(kind, provider);
                }
                Err(e) => tracing::debug!(provider = %kind, error = %e, "Provider not available"),
            }
        }
        Self { config, ready }
    }

    pub fn is_ready(&self, kind: ProviderKind) -> bool {
        self.ready.contains_key(&kind)
    }
}

impl ProviderSource for ProviderPool {
    fn provider(&self, kind: ProviderKind) -> Result<Provider, LlmError> {
        match self.ready.get(&kind) {
            Some(provider) => Ok(provider.clone()),
            None => create_provider(kind, &self.config),
        }
    }
}
