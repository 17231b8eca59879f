//! Unified OpenAI-compatible greeting generator.
//!
//! A single struct that handles chat completions for all compatible APIs;
//! providers are distinguished only by endpoint URL, auth style, and API key.
//! Every call carries a bounded timeout so a hung upstream cannot stall a
//! dispatch run.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

use wishline_core::config::LlmConfig;
use wishline_core::error::{Result, WishlineError};
use wishline_core::traits::{GreetingGenerator, GreetingRequest};

use crate::registry::{AuthStyle, ProviderConfig};

const SYSTEM_PROMPT: &str = "You are a helpful assistant that generates personalized birthday and anniversary messages. Create warm, heartfelt messages that are appropriate for the occasion and relationship.";

/// A unified generator that works with any OpenAI-compatible API.
pub struct OpenAiCompatibleGenerator {
    name: String,
    api_key: String,
    base_url: String,
    chat_path: String,
    auth_style: AuthStyle,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompatibleGenerator {
    /// Create from a known provider config + LLM settings.
    ///
    /// Resolution order:
    /// - API key: `config.api_key` > env vars > empty
    /// - Base URL: `config.endpoint` > env override > registry default
    pub fn from_registry(registry: &ProviderConfig, config: &LlmConfig) -> Result<Self> {
        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            registry
                .env_keys
                .iter()
                .find_map(|key| std::env::var(key).ok())
                .unwrap_or_default()
        };

        let base_url = if !config.endpoint.is_empty() {
            config.endpoint.trim_end_matches('/').to_string()
        } else {
            registry
                .base_url_env
                .and_then(|env_key| {
                    let val = std::env::var(env_key).ok()?;
                    // For OLLAMA_HOST style overrides, append /v1 if not present
                    if val.ends_with("/v1") {
                        Some(val)
                    } else {
                        Some(format!("{}/v1", val.trim_end_matches('/')))
                    }
                })
                .unwrap_or_else(|| registry.base_url.to_string())
        };

        Ok(Self {
            name: registry.name.to_string(),
            api_key,
            base_url,
            chat_path: registry.chat_path.to_string(),
            auth_style: registry.auth_style,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: build_client(config.timeout_secs)?,
        })
    }

    /// Create for a custom endpoint (e.g., "custom:https://my-server.com/v1").
    pub fn custom(endpoint: &str, config: &LlmConfig) -> Result<Self> {
        let base_url = endpoint
            .strip_prefix("custom:")
            .unwrap_or(endpoint)
            .trim_end_matches('/')
            .to_string();

        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            std::env::var("CUSTOM_API_KEY").unwrap_or_default()
        };

        let auth_style = if api_key.is_empty() {
            AuthStyle::None
        } else {
            AuthStyle::Bearer
        };

        Ok(Self {
            name: "custom".to_string(),
            api_key,
            base_url,
            chat_path: "/chat/completions".to_string(),
            auth_style,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: build_client(config.timeout_secs)?,
        })
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_style {
            AuthStyle::Bearer if !self.api_key.is_empty() => {
                req.header("Authorization", format!("Bearer {}", self.api_key))
            }
            _ => req,
        }
    }

    fn build_prompt(request: &GreetingRequest) -> String {
        format!(
            "Generate a {} {} message for {}. The relationship is: {}. \
             Make it personal, heartfelt, and appropriate for the occasion. \
             Keep it between 50-150 words. Do not include any greeting like 'Dear' or signature.",
            request.tone, request.occasion, request.contact_name, request.relationship
        )
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| WishlineError::Http(format!("HTTP client init: {e}")))
}

#[async_trait]
impl GreetingGenerator for OpenAiCompatibleGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &GreetingRequest) -> Result<String> {
        if self.auth_style != AuthStyle::None && self.api_key.is_empty() {
            return Err(WishlineError::ApiKeyMissing(self.name.clone()));
        }

        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": Self::build_prompt(request) },
            ],
        });

        let url = format!("{}{}", self.base_url, self.chat_path);
        let req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        let req = self.apply_auth(req);

        let resp = req.send().await.map_err(|e| {
            WishlineError::Http(format!("{} connection failed ({}): {}", self.name, url, e))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(WishlineError::Provider(format!(
                "{} API error {}: {}",
                self.name, status, text
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| WishlineError::Http(e.to_string()))?;

        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .map(str::trim)
            .unwrap_or("");

        if content.is_empty() {
            return Err(WishlineError::Provider(format!(
                "{} returned an empty completion",
                self.name
            )));
        }

        tracing::debug!("Generated {} greeting via {}", request.occasion, self.name);
        Ok(content.to_string())
    }
}
