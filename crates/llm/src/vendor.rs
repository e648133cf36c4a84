use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use toolgate_tool_runtime::{LlmError, VendorClient};

/// How a vendor expects its credential.
#[derive(Debug, Clone)]
enum Auth {
    /// `Authorization: Bearer <key>`
    Bearer(String),
    /// `?key=<key>` on the URL
    QueryKey(String),
    /// `x-api-key` plus a pinned `anthropic-version`
    Anthropic(String),
}

/// Sends prepared request bodies to one vendor endpoint.
///
/// One attempt per call; timeouts and non-200 statuses surface as errors.
pub struct HttpVendorClient {
    client: reqwest::Client,
    provider: &'static str,
    url: String,
    auth: Auth,
}

impl HttpVendorClient {
    fn build(provider: &'static str, url: String, auth: Auth, timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::NotConfigured(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            provider,
            url,
            auth,
        })
    }

    pub fn openai(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, LlmError> {
        let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));
        Self::build("openai", url, Auth::Bearer(api_key), timeout)
    }

    pub fn gemini(api_key: String, base_url: &str, model: &str, timeout: Duration) -> Result<Self, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model
        );
        Self::build("gemini", url, Auth::QueryKey(api_key), timeout)
    }

    pub fn claude(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, LlmError> {
        let url = format!("{}/v1/messages", base_url.trim_end_matches('/'));
        Self::build("claude", url, Auth::Anthropic(api_key), timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request(&self, body: &Value) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(body);
        match &self.auth {
            Auth::Bearer(key) => builder.header("Authorization", format!("Bearer {}", key)),
            Auth::QueryKey(key) => builder.query(&[("key", key.as_str())]),
            Auth::Anthropic(key) => builder
                .header("x-api-key", key)
                .header("anthropic-version", "2023-06-01"),
        }
    }
}

#[async_trait]
impl VendorClient for HttpVendorClient {
    async fn send(&self, request: Value) -> Result<Value, LlmError> {
        debug!(provider = self.provider, url = %self.url, "Vendor request");

        let response = self
            .request(&request)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}
