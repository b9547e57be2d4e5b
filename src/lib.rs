//! chatdb - ask questions about a relational database in plain language
//!
//! The agent turns a question into a single checked SQL statement:
//! - Schema cache with a deterministic text summary for prompts
//! - Keyword safety gate (optional parser-based second gate)
//! - Structural preflight and execution, each with one model-assisted repair
//! - Edit-distance hints for misspelled tables and columns
//!
//! Can be used as:
//! - Library (`Agent` over any `LanguageModel` / `DatabasePort`)
//! - CLI and HTTP server (`chatdb` binary, SQLite + Ollama/OpenAI/Anthropic)

pub mod types;
pub mod schema;
pub mod sql;
pub mod hint;
pub mod prompt;
pub mod agent;
pub mod llm;
pub mod db;
pub mod config;
pub mod telemetry;
pub mod server;

pub use agent::{Agent, PipelineResult};
pub use config::Config;
pub use types::{AgentError, Result};
