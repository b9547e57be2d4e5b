//! Language model port and HTTP transport.

pub mod client;

pub use client::LlmClient;

use crate::types::Result;
use async_trait::async_trait;

/// Text completion collaborator used by the agent.
///
/// One request, one response; no streaming. Transport timeouts are the
/// implementation's concern and surface as `AgentError::ModelError`.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt` under the given system preamble.
    async fn complete(&self, prompt: &str, system: &str) -> Result<String>;

    /// Model name, for spans and logs.
    fn model_name(&self) -> &str {
        "unknown"
    }
}
