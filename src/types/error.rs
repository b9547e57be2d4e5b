//! Error types for the query agent.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` implementations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

/// Comprehensive error type for agent, port and configuration operations.
///
/// Fatal infrastructure faults (schema unavailable, model transport failure
/// during planning or generation) surface as `Err(AgentError)`. Expected
/// failures such as safety violations are returned inside a `PipelineResult`
/// and never become an `AgentError`.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Schema introspection failed
    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(String),

    /// Language model call failed
    #[error("Model error: {0}")]
    ModelError(String),

    /// Structural dry run rejected the statement
    #[error("Structural validation failed: {0}")]
    StructuralError(String),

    /// Statement execution failed
    #[error("Query execution failed: {0}")]
    ExecutionError(String),

    /// Table not present in the database
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP client error (model transport)
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// SQLite driver error
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AgentError {
    /// Create a model error with context.
    pub fn model(msg: impl Into<String>) -> Self {
        Self::ModelError(msg.into())
    }

    /// Create a schema error with context.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaUnavailable(msg.into())
    }

    /// Create an execution error with context.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::ExecutionError(msg.into())
    }

    /// Check if error aborts a pipeline invocation.
    ///
    /// # Returns
    ///
    /// `true` for infrastructure faults the caller must treat as service-level,
    /// `false` for statement-level failures that the agent can report or repair
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::StructuralError(_) | Self::ExecutionError(_))
    }

    /// Underlying detail text without the variant prefix.
    ///
    /// Used when a port error is embedded in a repair prompt or a hint lookup,
    /// where the raw driver message is what matters.
    pub fn detail(&self) -> String {
        match self {
            Self::SchemaUnavailable(s)
            | Self::ModelError(s)
            | Self::StructuralError(s)
            | Self::ExecutionError(s)
            | Self::TableNotFound(s)
            | Self::ConfigError(s)
            | Self::InternalError(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
