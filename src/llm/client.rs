//! HTTP client for Ollama, OpenAI and Anthropic completion APIs.

use crate::config::{LlmConfig, LlmProvider};
use crate::llm::LanguageModel;
use crate::types::{AgentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const OLLAMA_URL: &str = "http://localhost:11434";
const OPENAI_URL: &str = "https://api.openai.com";
const ANTHROPIC_URL: &str = "https://api.anthropic.com";

/// Ollama `/api/generate` response (non-streaming).
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// OpenAI chat completion response.
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: String,
}

/// Anthropic messages response.
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}

/// Completion client over one of the supported providers.
pub struct LlmClient {
    provider: LlmProvider,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
    client: Client,
}

impl LlmClient {
    /// Build a client from configuration.
    ///
    /// OpenAI and Anthropic read their key from `api_key_env`, defaulting to
    /// `OPENAI_API_KEY` / `ANTHROPIC_API_KEY`. Ollama needs no key.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::ConfigError` if a required API key is not set
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = match config.provider {
            LlmProvider::Ollama => None,
            LlmProvider::OpenAI | LlmProvider::Anthropic => {
                let var = config
                    .api_key_env
                    .clone()
                    .unwrap_or_else(|| default_key_env(config.provider).to_string());
                let key = std::env::var(&var).map_err(|_| {
                    AgentError::ConfigError(format!("{} environment variable not set", var))
                })?;
                Some(key)
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            provider: config.provider,
            base_url: base_url(config.provider, &config.host),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        let path = match self.provider {
            LlmProvider::Ollama => "/api/generate",
            LlmProvider::OpenAI => "/v1/chat/completions",
            LlmProvider::Anthropic => "/v1/messages",
        };
        format!("{}{}", self.base_url, path)
    }

    /// Request body for the configured provider.
    fn request_body(&self, prompt: &str, system: &str) -> Value {
        match self.provider {
            LlmProvider::Ollama => json!({
                "model": self.model,
                "prompt": prompt,
                "system": system,
                "stream": false,
                "options": {"temperature": self.temperature}
            }),
            LlmProvider::OpenAI => json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": prompt}
                ],
                "temperature": self.temperature
            }),
            LlmProvider::Anthropic => json!({
                "model": self.model,
                "max_tokens": 4096,
                "system": system,
                "messages": [
                    {"role": "user", "content": prompt}
                ],
                "temperature": self.temperature
            }),
        }
    }

    async fn post(&self, body: &Value) -> Result<String> {
        let mut request = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(body);

        request = match (self.provider, &self.api_key) {
            (LlmProvider::OpenAI, Some(key)) => request.header("Authorization", format!("Bearer {}", key)),
            (LlmProvider::Anthropic, Some(key)) => request
                .header("x-api-key", key)
                .header("anthropic-version", "2023-06-01"),
            _ => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| AgentError::model(format!("{} request failed: {}", self.provider_name(), e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::model(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(AgentError::model(format!(
                "{} API error {}: {}",
                self.provider_name(),
                status,
                text
            )));
        }

        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        match self.provider {
            LlmProvider::Ollama => "Ollama",
            LlmProvider::OpenAI => "OpenAI",
            LlmProvider::Anthropic => "Anthropic",
        }
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String> {
        let body = self.request_body(prompt, system);
        let raw = self.post(&body).await?;

        let text = parse_completion(self.provider, &raw)?;
        debug!(provider = self.provider_name(), chars = text.len(), "Model response received");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn default_key_env(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        _ => "OPENAI_API_KEY",
    }
}

fn base_url(provider: LlmProvider, host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if !host.is_empty() {
        return host.to_string();
    }
    match provider {
        LlmProvider::Ollama => OLLAMA_URL,
        LlmProvider::OpenAI => OPENAI_URL,
        LlmProvider::Anthropic => ANTHROPIC_URL,
    }
    .to_string()
}

/// Pull the completion text out of a provider response body.
fn parse_completion(provider: LlmProvider, body: &str) -> Result<String> {
    let parse_err = |e: serde_json::Error| AgentError::model(format!("Failed to parse response: {}", e));

    match provider {
        LlmProvider::Ollama => {
            let parsed: OllamaResponse = serde_json::from_str(body).map_err(parse_err)?;
            Ok(parsed.response)
        }
        LlmProvider::OpenAI => {
            let parsed: OpenAIResponse = serde_json::from_str(body).map_err(parse_err)?;
            parsed
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| AgentError::model("No response from OpenAI"))
        }
        LlmProvider::Anthropic => {
            let parsed: AnthropicResponse = serde_json::from_str(body).map_err(parse_err)?;
            parsed
                .content
                .into_iter()
                .next()
                .map(|c| c.text)
                .ok_or_else(|| AgentError::model("No response from Anthropic"))
        }
    }
}
