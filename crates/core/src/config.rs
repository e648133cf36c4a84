use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub tools: ToolsConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TOOLGATE_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("TOOLGATE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            llm: LlmConfig::from_env_profiled(p),
            tools: ToolsConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  server:  {}:{} (session idle {}s, sweep every {}s)",
            self.server.host,
            self.server.port,
            self.server.session_idle_secs,
            self.server.session_sweep_secs
        );
        tracing::info!(
            "  llm:     openai={}, gemini={}, claude={}, max_hops={}",
            self.llm.openai_api_key.is_some(),
            self.llm.gemini_api_key.is_some(),
            self.llm.anthropic_api_key.is_some(),
            self.llm.max_hops
        );
        tracing::info!(
            "  tools:   gateway={}",
            self.tools.gateway_url.as_deref().unwrap_or("(in-process)")
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": {
                "host": self.server.host,
                "port": self.server.port,
                "session_idle_secs": self.server.session_idle_secs,
            },
            "llm": {
                "openai": { "model": self.llm.openai_model, "configured": self.llm.openai_api_key.is_some() },
                "gemini": { "model": self.llm.gemini_model, "configured": self.llm.gemini_api_key.is_some() },
                "claude": { "model": self.llm.anthropic_model, "configured": self.llm.anthropic_api_key.is_some() },
                "max_hops": self.llm.max_hops,
            },
            "tools": { "gateway_url": self.tools.gateway_url },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Sessions untouched for this long are evicted (0 disables eviction).
    pub session_idle_secs: u64,
    pub session_sweep_secs: u64,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 3001),
            session_idle_secs: profiled_env_u64(p, "SESSION_IDLE_SECS", 1800),
            session_sweep_secs: profiled_env_u64(p, "SESSION_SWEEP_SECS", 60),
        }
    }
}

// ── LLM vendors ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub anthropic_base_url: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Maximum tool executions per conversation turn.
    pub max_hops: usize,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            openai_model: profiled_env_or(p, "OPENAI_MODEL", "gpt-4o"),
            openai_base_url: profiled_env_or(p, "OPENAI_BASE_URL", "https://api.openai.com"),
            gemini_api_key: profiled_env_opt(p, "GEMINI_API_KEY"),
            gemini_model: profiled_env_or(p, "GEMINI_MODEL", "gemini-2.0-flash"),
            gemini_base_url: profiled_env_or(
                p,
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            anthropic_api_key: profiled_env_opt(p, "ANTHROPIC_API_KEY"),
            anthropic_model: profiled_env_or(p, "ANTHROPIC_MODEL", "claude-sonnet-4-20250514"),
            anthropic_base_url: profiled_env_or(p, "ANTHROPIC_BASE_URL", "https://api.anthropic.com"),
            max_tokens: profiled_env_u32(p, "LLM_MAX_TOKENS", 1024),
            timeout_secs: profiled_env_u64(p, "LLM_TIMEOUT_SECS", 60),
            max_hops: profiled_env_u32(p, "LLM_MAX_HOPS", 3) as usize,
        }
    }
}

// ── Tools ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Remote gateway serving tools. `None` uses the in-process registry.
    pub gateway_url: Option<String>,
}

impl ToolsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            gateway_url: profiled_env_opt(p, "TOOL_GATEWAY_URL"),
        }
    }
}
