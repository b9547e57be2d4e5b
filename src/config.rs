//! Configuration loading.
//!
//! YAML file located by `--config`, `CHATDB_CONFIG`, or `~/.chatdb/config.yaml`.
//! A missing file yields defaults; every section and field is optional.

use crate::types::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "CHATDB_CONFIG";

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "~/.chatdb/config.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub agent: AgentConfig,
}

/// Database location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path (`:memory:` allowed, `~` expanded).
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "~/.chatdb/chatdb.sqlite".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

/// Model provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Ollama,
    OpenAI,
    Anthropic,
}

/// Language model transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,

    /// Base URL. Empty means the provider default (local Ollama, public API otherwise).
    pub host: String,

    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,

    /// Environment variable holding the API key (OpenAI / Anthropic).
    pub api_key_env: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            host: String::new(),
            model: "llama3.1".to_string(),
            temperature: 0.1,
            timeout_secs: 120,
            api_key_env: None,
        }
    }
}

/// HTTP listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Settings consumed by the agent pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Row cap applied to every executed statement
    pub max_results: usize,

    /// Run the safety gate on generated SQL
    pub enable_query_validation: bool,

    /// Only allow read-only statements (requires validation)
    pub readonly_mode: bool,

    /// Reserved; repair is bounded to one attempt per failing stage
    pub max_iterations: usize,

    /// Add the parser-based second safety gate
    pub parse_check: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_results: 100,
            enable_query_validation: true,
            readonly_mode: true,
            max_iterations: 5,
            parse_check: false,
        }
    }
}

impl Config {
    /// Resolve the config file path.
    ///
    /// Explicit path wins, then `CHATDB_CONFIG`, then the default location.
    pub fn config_file(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string());
        }
        let raw = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        PathBuf::from(shellexpand::tilde(&raw).to_string())
    }

    /// Load configuration. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::ConfigError` if the file is unreadable, malformed
    /// or fails validation
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::config_file(explicit);

        let config = if path.exists() {
            debug!(path = %path.display(), "Loading config");
            let content = fs::read_to_string(&path)?;
            Self::from_yaml_str(&content)?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| AgentError::ConfigError(format!("Invalid config: {}", e)))
    }

    /// Reject settings the agent cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_results == 0 {
            return Err(AgentError::ConfigError("agent.max_results must be greater than 0".into()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(AgentError::ConfigError("llm.model must not be empty".into()));
        }
        if self.server.port == 0 {
            return Err(AgentError::ConfigError("server.port must not be 0".into()));
        }
        Ok(())
    }
}
