//! Core error types for the query agent.
//!
//! - `AgentError`: Error type for all agent and port operations
//! - `Result`: Convenient result type alias

pub mod error;

pub use error::{AgentError, Result};
